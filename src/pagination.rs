use crate::config::PaginationConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// A page request after defaults and limits have been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl PaginationQuery {
    pub fn resolve(&self, config: &PaginationConfig) -> Page {
        let max = i64::from(config.max_page_size.max(1));
        let number = self.page.unwrap_or(1).clamp(1, i64::from(u32::MAX));
        let size = self
            .page_size
            .unwrap_or(i64::from(config.default_page_size))
            .clamp(1, max);

        // Both are clamped into u32 range above
        Page {
            number: number as u32,
            size: size as u32,
        }
    }
}

impl Page {
    pub fn skip(&self) -> usize {
        (self.number as usize - 1) * self.size as usize
    }

    pub fn limit(&self) -> usize {
        self.size as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    pub method: String,
}

impl Link {
    fn get(rel: &str, href: String) -> Self {
        Link {
            rel: rel.to_string(),
            href,
            method: "GET".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: usize,
    pub total_pages: usize,
    pub links: Vec<Link>,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, page: Page, total_items: usize, resource: &str) -> Self {
        PagedResult {
            items,
            page: page.number,
            page_size: page.size,
            total_items,
            total_pages: total_items.div_ceil(page.size as usize),
            links: build_links(resource, page, total_items),
        }
    }
}

/// self, plus prev/next when those pages exist
pub fn build_links(resource: &str, page: Page, total_items: usize) -> Vec<Link> {
    let base = format!("/api/v1/{}", resource);
    let href = |number: u32| format!("{}?page={}&pageSize={}", base, number, page.size);

    let mut links = vec![Link::get("self", href(page.number))];

    if page.number > 1 {
        links.push(Link::get("prev", href(page.number - 1)));
    }

    if (page.number as usize) * (page.size as usize) < total_items {
        links.push(Link::get("next", href(page.number + 1)));
    }

    links
}
