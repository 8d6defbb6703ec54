// src/utils/url.rs

//! Upstream endpoint construction.

use url::Url;

use crate::error::{AppError, Result};
use crate::models::ApiConfig;

/// Builds the five resource URLs from the configured API bases.
#[derive(Debug, Clone)]
pub struct Endpoints {
    xmlapi2: Url,
    xmlapi: Url,
    include_buddies: bool,
}

impl Endpoints {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            xmlapi2: parse_base(&config.xmlapi2_url)?,
            xmlapi: parse_base(&config.xmlapi_url)?,
            include_buddies: config.include_buddies,
        })
    }

    /// `{xmlapi2}/forumlist?id={id}&type=thing`
    pub fn forum_list(&self, id: i64) -> String {
        endpoint(
            &self.xmlapi2,
            &["forumlist"],
            &[("id", &id.to_string()), ("type", "thing")],
        )
    }

    /// `{xmlapi2}/forum?id={id}`
    pub fn forum(&self, id: i64) -> String {
        endpoint(&self.xmlapi2, &["forum"], &[("id", &id.to_string())])
    }

    /// `{xmlapi2}/thread?id={id}`
    pub fn thread(&self, id: i64) -> String {
        endpoint(&self.xmlapi2, &["thread"], &[("id", &id.to_string())])
    }

    /// `{xmlapi2}/user?name={name}`, with `buddies=1` when enabled.
    pub fn user(&self, name: &str) -> String {
        if self.include_buddies {
            endpoint(&self.xmlapi2, &["user"], &[("name", name), ("buddies", "1")])
        } else {
            endpoint(&self.xmlapi2, &["user"], &[("name", name)])
        }
    }

    /// `{xmlapi}/collection/{name}`
    pub fn collection(&self, name: &str) -> String {
        endpoint(&self.xmlapi, &["collection", name], &[])
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(AppError::config(format!("API base is not a base URL: {raw}")));
    }
    Ok(url)
}

fn endpoint(base: &Url, segments: &[&str], params: &[(&str, &str)]) -> String {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    url.to_string()
}
