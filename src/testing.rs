//! Test doubles shared by the in-module test suites.

use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::services::{RawResponse, Transport};

enum Scripted {
    Response(RawResponse),
    Failure,
}

/// Transport answering from per-URL scripts.
///
/// Each URL replays its queued answers in order and then keeps repeating the
/// last one. URLs without a script answer 500.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, response: RawResponse) {
        self.enqueue(url, Scripted::Response(response));
    }

    /// Queue a 200 answer with an XML body.
    pub fn ok(&self, url: &str, body: impl Into<String>) {
        self.push(url, RawResponse::new(200, body.into()));
    }

    pub fn push_failure(&self, url: &str) {
        self.enqueue(url, Scripted::Failure);
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    pub fn requests_matching(&self, needle: &str) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.contains(needle))
            .cloned()
            .collect()
    }

    fn enqueue(&self, url: &str, answer: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(answer);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(url.to_string());

        let mut scripts = self.scripts.lock().unwrap();
        let Some(queue) = scripts.get_mut(url) else {
            return Ok(RawResponse::new(500, ""));
        };
        let answer = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().map(|a| match a {
                Scripted::Response(r) => Scripted::Response(r.clone()),
                Scripted::Failure => Scripted::Failure,
            })
        };

        match answer {
            Some(Scripted::Response(r)) => Ok(r),
            Some(Scripted::Failure) => Err(AppError::Io(ErrorKind::ConnectionReset.into())),
            None => Ok(RawResponse::new(500, "")),
        }
    }
}

pub fn forum_list_xml(id: i64, forum_ids: &[i64]) -> String {
    let forums: String = forum_ids
        .iter()
        .map(|f| format!(r#"<forum id="{f}" numthreads="1" numposts="1"/>"#))
        .collect();
    format!(r#"<forums type="thing" id="{id}">{forums}</forums>"#)
}

pub fn forum_xml(id: i64, thread_ids: &[i64]) -> String {
    let threads: String = thread_ids
        .iter()
        .map(|t| format!(r#"<thread id="{t}" numarticles="1"/>"#))
        .collect();
    format!(r#"<forum id="{id}" numthreads="{}"><threads>{threads}</threads></forum>"#, thread_ids.len())
}

pub fn thread_xml(id: i64, authors: &[&str]) -> String {
    let articles: String = authors
        .iter()
        .enumerate()
        .map(|(i, a)| format!(r#"<article id="{}" username="{a}"><body>x</body></article>"#, id * 100 + i as i64))
        .collect();
    format!(r#"<thread id="{id}" numarticles="{}"><articles>{articles}</articles></thread>"#, authors.len())
}

pub fn user_xml(id: i64, name: &str, buddies: &[(i64, &str)]) -> String {
    let buddies: String = buddies
        .iter()
        .map(|(bid, bname)| format!(r#"<buddy id="{bid}" name="{bname}"/>"#))
        .collect();
    format!(r#"<user id="{id}" name="{name}"><buddies total="1" page="1">{buddies}</buddies></user>"#)
}

/// Collection body from `(collid, game_id, name, rating)` rows.
pub fn collection_xml(items: &[(i64, i64, &str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(collid, game, name, rating)| {
            format!(
                r#"<item objecttype="thing" objectid="{game}" subtype="boardgame" collid="{collid}"><name sortindex="1">{name}</name><yearpublished>2000</yearpublished><image>{game}.jpg</image><stats minplayers="2" maxplayers="4" playingtime="60" numowned="10"><rating value="{rating}"><usersrated value="5"/><average value="7.0"/></rating></stats><status own="1" lastmodified="2020-01-01 00:00:00"/><numplays>1</numplays></item>"#
            )
        })
        .collect();
    format!(r#"<items totalitems="1">{items}</items>"#)
}
