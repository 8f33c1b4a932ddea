use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::node::{Api, Config, Cron, GraphNode, Middleware, Provider, Subscription};
use weft_model::TypeRef;

/// The resolved, immutable graph consumed by the code emitter. Every
/// listing surface is key-sorted so that emission is byte-stable across
/// runs.
#[derive(Debug, Clone)]
pub struct Graph {
    /// Type key -> the singleton provider resolved for it.
    singles: BTreeMap<String, Provider>,
    /// Providers retained only through `require=` edges, by node key.
    extras: BTreeMap<String, Provider>,
    /// Type key -> merged multi-provider group.
    multis: BTreeMap<String, Vec<Provider>>,
    /// Value-form type key -> config.
    configs: BTreeMap<String, Config>,
    apis: Vec<Api>,
    crons: Vec<Cron>,
    subscriptions: Vec<Subscription>,
    middleware: Vec<Middleware>,
    /// Consumer function key -> type keys it needs that nothing
    /// resolved. Reported, never thrown.
    missing: BTreeMap<String, Vec<String>>,
}

impl Graph {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        singles: BTreeMap<String, Provider>,
        extras: BTreeMap<String, Provider>,
        multis: BTreeMap<String, Vec<Provider>>,
        configs: BTreeMap<String, Config>,
        mut apis: Vec<Api>,
        mut crons: Vec<Cron>,
        mut subscriptions: Vec<Subscription>,
        mut middleware: Vec<Middleware>,
        missing: BTreeMap<String, Vec<String>>,
    ) -> Self {
        apis.sort_by(|a, b| a.key.cmp(&b.key));
        crons.sort_by(|a, b| a.key.cmp(&b.key));
        subscriptions.sort_by(|a, b| a.key.cmp(&b.key));
        middleware.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            singles,
            extras,
            multis,
            configs,
            apis,
            crons,
            subscriptions,
            middleware,
            missing,
        }
    }

    /// Every retained singleton provider (require-retained ones
    /// included), ordered by node key.
    pub fn providers(&self) -> Vec<&Provider> {
        let mut out: Vec<&Provider> = self.singles.values().chain(self.extras.values()).collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out.dedup_by(|a, b| a.key == b.key);
        out
    }

    /// Multi-provider groups by provided type key; members are ordered
    /// by node key.
    pub fn multi_providers(&self) -> &BTreeMap<String, Vec<Provider>> {
        &self.multis
    }

    /// Retained configs by value-form type key.
    pub fn configs(&self) -> impl Iterator<Item = &Config> + '_ {
        self.configs.values()
    }

    pub fn apis(&self) -> &[Api] {
        &self.apis
    }

    pub fn crons(&self) -> &[Cron] {
        &self.crons
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn middleware(&self) -> &[Middleware] {
        &self.middleware
    }

    /// Providers resolved for a type key: one for a singleton, the whole
    /// group for a multi type, none otherwise. Generic instances are
    /// returned like any concrete provider.
    pub fn get_providers(&self, type_key: &str) -> Vec<&Provider> {
        if let Some(p) = self.singles.get(type_key) {
            return vec![p];
        }
        if let Some(group) = self.multis.get(type_key) {
            return group.iter().collect();
        }
        Vec::new()
    }

    /// Config satisfying a type key, under pointer/value equivalence.
    pub fn get_config(&self, ty: &TypeRef) -> Option<&Config> {
        self.configs.get(&ty.value_form().key())
    }

    /// Unsatisfied dependencies, keyed by the consumer function.
    pub fn missing(&self) -> &BTreeMap<String, Vec<String>> {
        &self.missing
    }

    /// Producer key -> dependency keys, for external visualization.
    pub fn dependencies(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut add = |node: &dyn GraphNode| {
            let mut deps: Vec<String> = node
                .requires()
                .iter()
                .map(|k| k.to_string())
                .collect();
            deps.sort();
            deps.dedup();
            out.entry(node.key().0.clone()).or_default().extend(deps);
        };
        for provider in self.providers() {
            add(provider);
        }
        for group in self.multis.values() {
            for provider in group {
                add(provider);
            }
        }
        for config in self.configs.values() {
            add(config);
        }
        for api in &self.apis {
            add(api);
        }
        for cron in &self.crons {
            add(cron);
        }
        for sub in &self.subscriptions {
            add(sub);
        }
        for mw in &self.middleware {
            add(mw);
        }
        out
    }

    /// Serializable snapshot of the graph's shape.
    pub fn dependency_report(&self) -> DependencyReport {
        let mut nodes = Vec::new();
        let mut push = |kind: &str, node: &dyn GraphNode| {
            let mut deps: Vec<String> =
                node.requires().iter().map(|k| k.to_string()).collect();
            deps.sort();
            deps.dedup();
            nodes.push(ReportNode {
                key: node.key().0.clone(),
                kind: kind.to_string(),
                provides: node.provides().map(|t| t.0),
                deps,
                pos: node.pos().to_string(),
            });
        };
        for provider in self.providers() {
            push("provider", provider);
        }
        for group in self.multis.values() {
            for provider in group {
                push("multi", provider);
            }
        }
        for config in self.configs.values() {
            push("config", config);
        }
        for api in &self.apis {
            push("api", api);
        }
        for cron in &self.crons {
            push("cron", cron);
        }
        for sub in &self.subscriptions {
            push("subscription", sub);
        }
        for mw in &self.middleware {
            push("middleware", mw);
        }
        nodes.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.kind.cmp(&b.kind)));
        DependencyReport { nodes }
    }
}

/// One node of a [`DependencyReport`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportNode {
    pub key: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provides: Option<String>,
    pub deps: Vec<String>,
    pub pos: String,
}

/// External visualization export of the resolved graph.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub nodes: Vec<ReportNode>,
}

impl DependencyReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Graphviz DOT rendering, one edge per dependency.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph wiring {\n  rankdir=LR;\n");
        for node in &self.nodes {
            let label = match &node.provides {
                Some(provides) => format!("{}\\n{}", node.key, provides),
                None => node.key.clone(),
            };
            let _ = writeln!(out, "  \"{}\" [label=\"{}\"];", node.key, label);
        }
        for node in &self.nodes {
            for dep in &node.deps {
                let _ = writeln!(out, "  \"{}\" -> \"{}\";", node.key, dep);
            }
        }
        out.push_str("}\n");
        out
    }
}
