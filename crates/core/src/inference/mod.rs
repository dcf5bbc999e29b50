//! Relationship inference.
//!
//! For every resource declared in a template, a fixed list of strategies keyed
//! by the resource's `ResourceKind` decides which other logical names it
//! invokes. Strategies are additive: their edges are unioned. The result for a
//! template is a `TemplateRelations`, which the graph merger folds into the
//! persisted graph.
//!
//! Edge direction: if X's properties reference Y, then X invokes Y. A few
//! strategies synthesize edges between *other* resources instead (an event
//! source mapping links its queue to its function, for example).

pub mod kind;
pub mod strategies;

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::intrinsics::ReferenceWarning;
use crate::template::Template;

pub use kind::{
    display_type, ResourceKind, ServicePrincipal, DEFAULT_EXCLUDED_TYPES, SERVICE_ACCOUNT,
};
pub use strategies::{EdgeStrategy, Strategy};

/// Tunables for the inference engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceOptions {
    /// Declared types treated as identity/configuration resources.
    pub excluded_types: BTreeSet<String>,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self { excluded_types: DEFAULT_EXCLUDED_TYPES.iter().map(|t| t.to_string()).collect() }
    }
}

impl InferenceOptions {
    /// Add more identity types on top of the defaults.
    pub fn with_extra_excluded_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_types.extend(types.into_iter().map(Into::into));
        self
    }
}

/// A caller -> callee pair, by logical name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InferredEdge {
    pub caller: String,
    pub callee: String,
}

impl InferredEdge {
    pub fn new(caller: impl Into<String>, callee: impl Into<String>) -> Self {
        Self { caller: caller.into(), callee: callee.into() }
    }
}

/// Type and account of a resource the template itself vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredResource {
    pub resource_type: String,
    pub account_name: String,
}

/// Something a strategy could not link. Skipped, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceWarning {
    #[error(transparent)]
    Reference(#[from] ReferenceWarning),

    #[error("could not resolve both `{source_property}` and `{target_property}`")]
    UnresolvedEndpoints { source_property: &'static str, target_property: &'static str },

    #[error("event `{event}` has no resolvable `{property}`")]
    UnresolvedEventSource { event: String, property: &'static str },

    #[error("no AppSync data source is named `{name}`")]
    UnknownDataSource { name: String },
}

/// An `InferenceWarning` attributed to the resource that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceWarning {
    pub resource: String,
    pub warning: InferenceWarning,
}

/// Everything inferred from one template + account pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateRelations {
    pub account_name: String,
    /// Declared resources and synthesized service resources.
    pub declared: BTreeMap<String, DeclaredResource>,
    pub edges: BTreeSet<InferredEdge>,
    pub warnings: Vec<ResourceWarning>,
}

impl TemplateRelations {
    /// Callees of `caller`, in name order.
    pub fn invokes_of<'a>(&'a self, caller: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges.iter().filter(move |e| e.caller == caller).map(|e| e.callee.as_str())
    }

    pub fn has_edge(&self, caller: &str, callee: &str) -> bool {
        self.edges.iter().any(|e| e.caller == caller && e.callee == callee)
    }
}

/// Read-only view strategies get of the template being processed.
pub struct InferenceContext<'a> {
    pub template: &'a Template,
    pub options: &'a InferenceOptions,
}

impl<'a> InferenceContext<'a> {
    /// Template parameters and identity-typed resources are never targets.
    pub fn is_excluded_target(&self, name: &str) -> bool {
        if self.template.is_parameter(name) {
            return true;
        }
        self.template
            .declared_type(name)
            .map(|t| self.options.excluded_types.contains(t))
            .unwrap_or(false)
    }
}

/// Collector the strategies write into.
#[derive(Debug, Default)]
pub struct EdgeSink {
    edges: BTreeSet<InferredEdge>,
    services: BTreeSet<ServicePrincipal>,
    warnings: Vec<ResourceWarning>,
}

impl EdgeSink {
    /// Record `caller -> callee`. Self references are dropped.
    pub fn link(&mut self, caller: &str, callee: &str) {
        if caller == callee {
            return;
        }
        if self.edges.insert(InferredEdge::new(caller, callee)) {
            debug!(caller, callee, "inferred edge");
        }
    }

    /// Record an edge from an AWS service that has no declaration of its own.
    pub fn link_from_service(&mut self, service: ServicePrincipal, callee: &str) {
        self.services.insert(service);
        self.link(service.name(), callee);
    }

    pub fn warn(&mut self, resource: &str, warning: impl Into<InferenceWarning>) {
        let warning = warning.into();
        warn!(resource, %warning, "skipped unresolvable reference");
        self.warnings.push(ResourceWarning { resource: resource.to_string(), warning });
    }

    pub fn warn_all<I>(&mut self, resource: &str, warnings: I)
    where
        I: IntoIterator<Item = ReferenceWarning>,
    {
        for warning in warnings {
            self.warn(resource, warning);
        }
    }
}

/// Applies the per-kind strategies to every resource of a template.
#[derive(Debug, Clone, Default)]
pub struct InferenceEngine {
    options: InferenceOptions,
}

impl InferenceEngine {
    pub fn new(options: InferenceOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &InferenceOptions {
        &self.options
    }

    /// Infer all edges of `template`, labelling its resources with `account_name`.
    ///
    /// Pure: the same template and label always produce the same relations.
    pub fn infer(&self, template: &Template, account_name: &str) -> TemplateRelations {
        let ctx = InferenceContext { template, options: &self.options };
        let mut sink = EdgeSink::default();
        let mut declared = BTreeMap::new();

        for decl in &template.resources {
            declared.insert(
                decl.logical_name.clone(),
                DeclaredResource {
                    resource_type: display_type(&decl.declared_type).to_string(),
                    account_name: account_name.to_string(),
                },
            );

            let kind = ResourceKind::classify(&decl.declared_type, &self.options.excluded_types);
            for strategy in kind.strategies() {
                strategy.infer_edges(decl, &ctx, &mut sink);
            }
        }

        for service in &sink.services {
            declared.entry(service.name().to_string()).or_insert_with(|| DeclaredResource {
                resource_type: display_type(service.resource_type()).to_string(),
                account_name: SERVICE_ACCOUNT.to_string(),
            });
        }

        info!(
            account = account_name,
            resources = template.resources.len(),
            edges = sink.edges.len(),
            warnings = sink.warnings.len(),
            "inferred template relations"
        );

        TemplateRelations {
            account_name: account_name.to_string(),
            declared,
            edges: sink.edges,
            warnings: sink.warnings,
        }
    }
}
