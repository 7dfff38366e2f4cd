//! Query builder for the quote summary (live quote + company profile) endpoint.

use url::Url;

use super::common::Query;

/// Data modules that can be requested from the quote summary endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuoteSummaryModule {
    Price,
    SummaryDetail,
    AssetProfile,
}

impl QuoteSummaryModule {
    fn as_str(&self) -> &'static str {
        match self {
            QuoteSummaryModule::Price => "price",
            QuoteSummaryModule::SummaryDetail => "summaryDetail",
            QuoteSummaryModule::AssetProfile => "assetProfile",
        }
    }
}

/// Parameters for `GET /v10/finance/quoteSummary/{symbol}`.
#[derive(Clone, Debug)]
pub struct QuoteSummaryQuery {
    pub modules: Vec<QuoteSummaryModule>,
    pub crumb: Option<String>,
}

impl Default for QuoteSummaryQuery {
    fn default() -> Self {
        Self {
            modules: vec![
                QuoteSummaryModule::Price,
                QuoteSummaryModule::SummaryDetail,
                QuoteSummaryModule::AssetProfile,
            ],
            crumb: None,
        }
    }
}

impl QuoteSummaryQuery {
    pub fn with_modules(mut self, modules: Vec<QuoteSummaryModule>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_crumb(mut self, crumb: &str) -> Self {
        self.crumb = Some(crumb.to_string());
        self
    }
}

impl Query for QuoteSummaryQuery {
    fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        let modules = self
            .modules
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(",");
        url.query_pairs_mut().append_pair("modules", &modules);
        if let Some(ref crumb) = self.crumb {
            url.query_pairs_mut().append_pair("crumb", crumb);
        }
        url
    }
}
