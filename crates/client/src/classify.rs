//! Request classification.
//!
//! Classification is an ordered decision table: the first rule whose
//! predicate matches decides the route. The table is data so its order can be
//! inspected and tested on its own.

use offline_core::{AgentConfig, Error};
use reqwest::{Method, Url};
use serde::Serialize;
use std::fmt;

use crate::fetch::same_origin;
use crate::request::{Destination, InterceptedRequest, RequestMode};

/// Resource category of a handled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Navigation,
    Stylesheet,
    Script,
    Api,
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Navigation => "navigation",
            Category::Stylesheet => "stylesheet",
            Category::Script => "script",
            Category::Api => "api",
            Category::Other => "other",
        };
        f.write_str(name)
    }
}

/// Classifier verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not ours: the request goes to the network untouched.
    PassThrough,
    Handle(Category),
}

/// One row of the decision table.
pub struct Rule {
    pub name: &'static str,
    pub route: Route,
    matches: fn(&Classifier, &InterceptedRequest) -> bool,
}

impl Rule {
    pub fn matches(&self, classifier: &Classifier, request: &InterceptedRequest) -> bool {
        (self.matches)(classifier, request)
    }
}

const RULES: &[Rule] = &[
    Rule { name: "cross-origin", route: Route::PassThrough, matches: is_cross_origin },
    Rule { name: "non-get", route: Route::PassThrough, matches: is_not_get },
    Rule { name: "navigation", route: Route::Handle(Category::Navigation), matches: is_navigation },
    Rule { name: "stylesheet", route: Route::Handle(Category::Stylesheet), matches: is_stylesheet },
    Rule { name: "script", route: Route::Handle(Category::Script), matches: is_script },
    Rule { name: "api", route: Route::Handle(Category::Api), matches: is_api },
    Rule { name: "other", route: Route::Handle(Category::Other), matches: always },
];

fn is_cross_origin(c: &Classifier, req: &InterceptedRequest) -> bool {
    !same_origin(&c.origin, &req.url)
}

fn is_not_get(_: &Classifier, req: &InterceptedRequest) -> bool {
    req.method != Method::GET
}

fn is_navigation(_: &Classifier, req: &InterceptedRequest) -> bool {
    req.mode == RequestMode::Navigate
        || req.destination == Destination::Document
        || req.accept.as_deref().is_some_and(|accept| accept.contains("text/html"))
}

fn is_stylesheet(c: &Classifier, req: &InterceptedRequest) -> bool {
    let path = req.path();
    path.ends_with(".css") || path.contains(&c.stylesheet_bundle_path)
}

fn is_script(c: &Classifier, req: &InterceptedRequest) -> bool {
    let path = req.path();
    path.ends_with(".js") || path.contains(&c.static_bundle_path)
}

fn is_api(c: &Classifier, req: &InterceptedRequest) -> bool {
    req.path().starts_with(&c.api_prefix)
}

fn always(_: &Classifier, _: &InterceptedRequest) -> bool {
    true
}

/// Decides, for each intercepted request, whether and how the agent handles it.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Url,
    api_prefix: String,
    stylesheet_bundle_path: String,
    static_bundle_path: String,
}

impl Classifier {
    pub fn new(config: &AgentConfig) -> Result<Self, Error> {
        let origin = config
            .origin_url()
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            origin,
            api_prefix: config.api_prefix.clone(),
            stylesheet_bundle_path: config.stylesheet_bundle_path.clone(),
            static_bundle_path: config.static_bundle_path.clone(),
        })
    }

    /// The decision table, in evaluation order.
    pub fn rules() -> &'static [Rule] {
        RULES
    }

    /// First matching rule for `request`.
    pub fn matching_rule(&self, request: &InterceptedRequest) -> &'static Rule {
        RULES
            .iter()
            .find(|rule| rule.matches(self, request))
            .unwrap_or(&RULES[RULES.len() - 1])
    }

    pub fn classify(&self, request: &InterceptedRequest) -> Route {
        self.matching_rule(request).route
    }
}
