use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use super::kind::{ResourceKind, ServicePrincipal, APPSYNC_DATA_SOURCE, IAM_ROLE};
use super::{EdgeSink, InferenceContext, InferenceWarning};
use crate::intrinsics::{self, Resolution};
use crate::template::ResourceDecl;

/// Uniform capability every strategy implements: look at one declaration and
/// write the edges it implies into the sink.
pub trait EdgeStrategy {
    fn infer_edges(&self, decl: &ResourceDecl, ctx: &InferenceContext<'_>, sink: &mut EdgeSink);
}

/// The closed set of edge strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Every reference in the properties (minus `skip`) is a callee.
    GenericScan { skip: &'static [&'static str] },
    /// Invoke permissions granted by the resource's execution role.
    RoleGrants,
    /// SAM `Events`: each event source invokes the function.
    ServerlessEvents,
    /// `${Name}` placeholders inside a raw `DefinitionString`.
    StateMachineDefinition,
    /// `EventSourceArn` invokes `FunctionName`; the mapping itself has no edges.
    EventSourceMapping,
    /// `TopicArn` invokes `Endpoint`; the subscription itself has no edges.
    SnsSubscription,
    /// `SourceArn` (or the principal's service) invokes `FunctionName`.
    ServicePermission,
    /// Integration targets of API gateway resources. Same mechanism as the
    /// generic scan.
    GatewayIntegration,
    /// An AppSync resolver invokes the data source whose `Name` matches its
    /// `DataSourceName`.
    ResolverDataSource,
}

impl EdgeStrategy for Strategy {
    fn infer_edges(&self, decl: &ResourceDecl, ctx: &InferenceContext<'_>, sink: &mut EdgeSink) {
        match *self {
            Strategy::GenericScan { skip } => generic_scan(decl, skip, ctx, sink),
            Strategy::GatewayIntegration => generic_scan(decl, &[], ctx, sink),
            Strategy::RoleGrants => role_grants(decl, ctx, sink),
            Strategy::ServerlessEvents => serverless_events(decl, ctx, sink),
            Strategy::StateMachineDefinition => state_machine_definition(decl, ctx, sink),
            Strategy::EventSourceMapping => {
                link_endpoints(decl, "EventSourceArn", "FunctionName", ctx, sink)
            }
            Strategy::SnsSubscription => link_endpoints(decl, "TopicArn", "Endpoint", ctx, sink),
            Strategy::ServicePermission => service_permission(decl, ctx, sink),
            Strategy::ResolverDataSource => resolver_data_source(decl, ctx, sink),
        }
    }
}

/// Resolve `value`, log what could not be resolved, and drop excluded names.
fn targets_in(
    value: &Value,
    resource: &str,
    ctx: &InferenceContext<'_>,
    sink: &mut EdgeSink,
) -> BTreeSet<String> {
    let Resolution { names, warnings } = intrinsics::resolve(value);
    sink.warn_all(resource, warnings);
    names.into_iter().filter(|name| !ctx.is_excluded_target(name)).collect()
}

fn property_targets(
    decl: &ResourceDecl,
    property: &str,
    ctx: &InferenceContext<'_>,
    sink: &mut EdgeSink,
) -> BTreeSet<String> {
    match decl.property(property) {
        Some(value) => targets_in(value, &decl.logical_name, ctx, sink),
        None => BTreeSet::new(),
    }
}

fn generic_scan(
    decl: &ResourceDecl,
    skip: &[&str],
    ctx: &InferenceContext<'_>,
    sink: &mut EdgeSink,
) {
    let Some(properties) = decl.properties.as_object() else {
        return;
    };
    for (key, value) in properties {
        if skip.contains(&key.as_str()) {
            continue;
        }
        for target in targets_in(value, &decl.logical_name, ctx, sink) {
            sink.link(&decl.logical_name, &target);
        }
    }
}

fn role_grants(decl: &ResourceDecl, ctx: &InferenceContext<'_>, sink: &mut EdgeSink) {
    let role_ref = decl.property("Role").or_else(|| decl.property("RoleArn"));
    let Some(role_name) = role_ref.and_then(intrinsics::resolve_single) else {
        return;
    };
    let Some(role) = ctx.template.get(&role_name).filter(|r| r.declared_type == IAM_ROLE) else {
        return;
    };

    let mut documents: Vec<&Value> = role
        .property("Policies")
        .and_then(Value::as_array)
        .map(|policies| policies.iter().filter_map(|p| p.get("PolicyDocument")).collect())
        .unwrap_or_default();

    // Standalone policies attached to the role through `Roles`.
    for policy in &ctx.template.resources {
        if !matches!(policy.declared_type.as_str(), "AWS::IAM::Policy" | "AWS::IAM::ManagedPolicy")
        {
            continue;
        }
        let attached = policy
            .property("Roles")
            .map(|roles| intrinsics::resolve(roles).names.contains(&role_name))
            .unwrap_or(false);
        if let (true, Some(document)) = (attached, policy.property("PolicyDocument")) {
            documents.push(document);
        }
    }

    for document in documents {
        for statement in statements(document) {
            let Some(grant) = grants_invoke(statement) else {
                continue;
            };
            let Some(resources) = statement.get("Resource") else {
                continue;
            };
            for target in targets_in(resources, &decl.logical_name, ctx, sink) {
                if grant == Grant::Wildcard && !is_invocable_in(ctx, &target) {
                    continue;
                }
                debug!(
                    caller = %decl.logical_name,
                    role = %role_name,
                    callee = %target,
                    "role grants invoke"
                );
                sink.link(&decl.logical_name, &target);
            }
        }
    }
}

/// How a statement grants invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Grant {
    /// `*`, `lambda:*` or `states:*`: only functions and state machines count.
    Wildcard,
    /// A named invoke action: every listed resource counts.
    Explicit,
}

fn is_invocable_in(ctx: &InferenceContext<'_>, name: &str) -> bool {
    ctx.template
        .declared_type(name)
        .map(|t| ResourceKind::classify(t, &ctx.options.excluded_types).is_invocable())
        .unwrap_or(false)
}

fn statements(document: &Value) -> Vec<&Value> {
    match document.get("Statement") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ Value::Object(_)) => vec![single],
        _ => Vec::new(),
    }
}

/// The strongest invoke grant among the statement's actions, if any.
fn grants_invoke(statement: &Value) -> Option<Grant> {
    if statement.get("Effect").and_then(Value::as_str) != Some("Allow") {
        return None;
    }
    match statement.get("Action") {
        Some(Value::String(action)) => invoke_grant(action),
        Some(Value::Array(actions)) => {
            actions.iter().filter_map(Value::as_str).filter_map(invoke_grant).max()
        }
        _ => None,
    }
}

fn invoke_grant(action: &str) -> Option<Grant> {
    match action.to_ascii_lowercase().as_str() {
        "*" | "lambda:*" | "states:*" => Some(Grant::Wildcard),
        "lambda:invokefunction"
        | "lambda:invokeasync"
        | "states:startexecution"
        | "states:startsyncexecution" => Some(Grant::Explicit),
        _ => None,
    }
}

fn serverless_events(decl: &ResourceDecl, ctx: &InferenceContext<'_>, sink: &mut EdgeSink) {
    let Some(events) = decl.property("Events").and_then(Value::as_object) else {
        return;
    };
    let function = decl.logical_name.as_str();

    for (event_name, event) in events {
        let event_type = event.get("Type").and_then(Value::as_str).unwrap_or_default();
        let (property, fallback) = match event_type {
            "SQS" => ("Queue", None),
            "SNS" => ("Topic", None),
            "Kinesis" | "DynamoDB" => ("Stream", None),
            "Api" => ("RestApiId", Some(ServicePrincipal::ApiGateway)),
            "HttpApi" => ("ApiId", Some(ServicePrincipal::ApiGateway)),
            "S3" => ("Bucket", Some(ServicePrincipal::S3)),
            "Schedule" | "ScheduleV2" | "CloudWatchEvent" | "EventBridgeRule" => {
                ("EventBusName", Some(ServicePrincipal::EventBridge))
            }
            other => {
                debug!(function, event = %event_name, event_type = other, "unsupported event type");
                continue;
            }
        };

        let sources = event
            .get("Properties")
            .and_then(|props| props.get(property))
            .map(|value| targets_in(value, function, ctx, sink))
            .unwrap_or_default();

        if !sources.is_empty() {
            for source in &sources {
                sink.link(source, function);
            }
        } else if let Some(service) = fallback {
            sink.link_from_service(service, function);
        } else {
            sink.warn(
                function,
                InferenceWarning::UnresolvedEventSource { event: event_name.clone(), property },
            );
        }
    }
}

fn state_machine_definition(decl: &ResourceDecl, ctx: &InferenceContext<'_>, sink: &mut EdgeSink) {
    let Some(Value::String(raw)) = decl.property("DefinitionString") else {
        return;
    };

    // Substitution keys are variables, not resources.
    let locals: BTreeSet<String> = decl
        .property("DefinitionSubstitutions")
        .and_then(Value::as_object)
        .map(|subs| subs.keys().cloned().collect())
        .unwrap_or_default();

    let Resolution { names, warnings } = intrinsics::resolve_interpolations(raw, &locals);
    sink.warn_all(&decl.logical_name, warnings);
    for name in names.iter().filter(|name| !ctx.is_excluded_target(name)) {
        sink.link(&decl.logical_name, name);
    }
}

fn link_endpoints(
    decl: &ResourceDecl,
    source_property: &'static str,
    target_property: &'static str,
    ctx: &InferenceContext<'_>,
    sink: &mut EdgeSink,
) {
    let sources = property_targets(decl, source_property, ctx, sink);
    let targets = property_targets(decl, target_property, ctx, sink);

    if sources.is_empty() || targets.is_empty() {
        sink.warn(
            &decl.logical_name,
            InferenceWarning::UnresolvedEndpoints { source_property, target_property },
        );
        return;
    }

    for source in &sources {
        for target in &targets {
            sink.link(source, target);
        }
    }
}

fn service_permission(decl: &ResourceDecl, ctx: &InferenceContext<'_>, sink: &mut EdgeSink) {
    let functions = property_targets(decl, "FunctionName", ctx, sink);
    if functions.is_empty() {
        return;
    }

    let callers = property_targets(decl, "SourceArn", ctx, sink);
    if !callers.is_empty() {
        for caller in &callers {
            for function in &functions {
                sink.link(caller, function);
            }
        }
        return;
    }

    let principal = decl.property("Principal").and_then(Value::as_str);
    match principal.and_then(ServicePrincipal::from_principal) {
        Some(service) => {
            for function in &functions {
                sink.link_from_service(service, function);
            }
        }
        None => {
            debug!(permission = %decl.logical_name, ?principal, "principal is not a known service");
        }
    }
}

fn resolver_data_source(decl: &ResourceDecl, ctx: &InferenceContext<'_>, sink: &mut EdgeSink) {
    // A reference here is already linked by the generic scan.
    let Some(Value::String(wanted)) = decl.property("DataSourceName") else {
        return;
    };

    let source = ctx.template.resources.iter().find(|candidate| {
        candidate.declared_type == APPSYNC_DATA_SOURCE
            && candidate.property("Name").and_then(Value::as_str) == Some(wanted.as_str())
    });
    match source {
        Some(source) => sink.link(&decl.logical_name, &source.logical_name),
        None => sink.warn(
            &decl.logical_name,
            InferenceWarning::UnknownDataSource { name: wanted.clone() },
        ),
    }
}
