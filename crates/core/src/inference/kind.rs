use std::collections::BTreeSet;

use super::strategies::Strategy;

/// Declared types that describe identity or permissions rather than a callable
/// resource. They are never `invokes` targets and contribute no edges of
/// their own (except `AWS::Lambda::Permission`, see `ResourceKind`).
pub const DEFAULT_EXCLUDED_TYPES: &[&str] = &[
    "AWS::IAM::Role",
    "AWS::IAM::Policy",
    "AWS::IAM::ManagedPolicy",
    "AWS::IAM::RolePolicy",
    "AWS::IAM::InstanceProfile",
    "AWS::Lambda::Permission",
];

pub const LAMBDA_FUNCTION: &str = "AWS::Lambda::Function";
pub const SERVERLESS_FUNCTION: &str = "AWS::Serverless::Function";
pub const IAM_ROLE: &str = "AWS::IAM::Role";
pub const APPSYNC_DATA_SOURCE: &str = "AWS::AppSync::DataSource";

/// Type label written to the graph for a declared type. Only the synthesized
/// service types have a friendly label; everything else keeps its raw type.
pub fn display_type(declared_type: &str) -> &str {
    match declared_type {
        "AWS::Service::S3" => "S3 Service",
        "AWS::Service::EventBridge" => "EventBridge Service",
        "AWS::Service::APIGateway" => "API Gateway Service",
        "AWS::Service::SQS" => "SQS Service",
        "AWS::Service::SNS" => "SNS Service",
        other => other,
    }
}

/// Coarse classification of a declared type, used to pick edge strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Function,
    ServerlessFunction,
    StateMachine,
    EventSourceMapping,
    SnsSubscription,
    LambdaPermission,
    ApiGateway,
    AppSyncResolver,
    /// Role/policy style resources listed in the excluded-type set.
    Identity,
    Other,
}

impl ResourceKind {
    pub fn classify(declared_type: &str, excluded_types: &BTreeSet<String>) -> Self {
        match declared_type {
            LAMBDA_FUNCTION => ResourceKind::Function,
            SERVERLESS_FUNCTION => ResourceKind::ServerlessFunction,
            "AWS::StepFunctions::StateMachine" | "AWS::Serverless::StateMachine" => {
                ResourceKind::StateMachine
            }
            "AWS::Lambda::EventSourceMapping" => ResourceKind::EventSourceMapping,
            "AWS::SNS::Subscription" => ResourceKind::SnsSubscription,
            "AWS::Lambda::Permission" => ResourceKind::LambdaPermission,
            "AWS::AppSync::Resolver" => ResourceKind::AppSyncResolver,
            t if excluded_types.contains(t) => ResourceKind::Identity,
            t if t.starts_with("AWS::ApiGateway::")
                || t.starts_with("AWS::ApiGatewayV2::")
                || t == "AWS::Serverless::Api"
                || t == "AWS::Serverless::HttpApi" =>
            {
                ResourceKind::ApiGateway
            }
            _ => ResourceKind::Other,
        }
    }

    /// Functions and state machines: the only targets a wildcard grant reaches.
    pub fn is_invocable(self) -> bool {
        matches!(
            self,
            ResourceKind::Function | ResourceKind::ServerlessFunction | ResourceKind::StateMachine
        )
    }

    /// Strategies applied, in order, to a resource of this kind.
    pub fn strategies(self) -> &'static [Strategy] {
        match self {
            ResourceKind::Function => &[Strategy::GenericScan { skip: &[] }, Strategy::RoleGrants],
            ResourceKind::ServerlessFunction => &[
                Strategy::GenericScan { skip: &["Events"] },
                Strategy::ServerlessEvents,
                Strategy::RoleGrants,
            ],
            ResourceKind::StateMachine => &[
                Strategy::GenericScan { skip: &[] },
                Strategy::StateMachineDefinition,
                Strategy::RoleGrants,
            ],
            ResourceKind::EventSourceMapping => &[Strategy::EventSourceMapping],
            ResourceKind::SnsSubscription => &[Strategy::SnsSubscription],
            ResourceKind::LambdaPermission => &[Strategy::ServicePermission],
            ResourceKind::ApiGateway => &[Strategy::GatewayIntegration],
            ResourceKind::AppSyncResolver => {
                &[Strategy::GenericScan { skip: &[] }, Strategy::ResolverDataSource]
            }
            ResourceKind::Identity => &[],
            ResourceKind::Other => &[Strategy::GenericScan { skip: &[] }],
        }
    }
}

/// Account label given to synthesized service resources.
pub const SERVICE_ACCOUNT: &str = "AWS";

/// AWS services that appear as callers without being declared in any template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServicePrincipal {
    S3,
    EventBridge,
    ApiGateway,
    Sqs,
    Sns,
}

impl ServicePrincipal {
    pub fn from_principal(principal: &str) -> Option<Self> {
        match principal {
            "s3.amazonaws.com" => Some(ServicePrincipal::S3),
            "events.amazonaws.com" => Some(ServicePrincipal::EventBridge),
            "apigateway.amazonaws.com" => Some(ServicePrincipal::ApiGateway),
            "sqs.amazonaws.com" => Some(ServicePrincipal::Sqs),
            "sns.amazonaws.com" => Some(ServicePrincipal::Sns),
            _ => None,
        }
    }

    /// Graph name of the service resource.
    pub fn name(self) -> &'static str {
        match self {
            ServicePrincipal::S3 => "S3",
            ServicePrincipal::EventBridge => "EventBridge",
            ServicePrincipal::ApiGateway => "APIGateway",
            ServicePrincipal::Sqs => "SQS",
            ServicePrincipal::Sns => "SNS",
        }
    }

    pub fn resource_type(self) -> &'static str {
        match self {
            ServicePrincipal::S3 => "AWS::Service::S3",
            ServicePrincipal::EventBridge => "AWS::Service::EventBridge",
            ServicePrincipal::ApiGateway => "AWS::Service::APIGateway",
            ServicePrincipal::Sqs => "AWS::Service::SQS",
            ServicePrincipal::Sns => "AWS::Service::SNS",
        }
    }
}
