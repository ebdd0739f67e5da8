//! Test cases
//!
//! Every case is a stateless, named check with a setup/run/teardown
//! lifecycle. Cases hold no environment of their own; the branch runner
//! passes its environment into every call, so one registry serves both
//! auth branches.

mod probe;

pub use probe::{Probe, ProbeCase};

use async_trait::async_trait;

use crate::common::Result;
use crate::environment::Environment;

/// One independent, repeatable integration check
#[async_trait]
pub trait TestCase: Send + Sync {
    /// Stable name used for selection and reporting
    fn name(&self) -> &str;

    /// Bring the environment into the state the check needs
    async fn setup(&self, env: &dyn Environment) -> Result<()>;

    /// Perform the check
    async fn run(&self, env: &dyn Environment) -> Result<()>;

    /// Undo what setup did
    async fn teardown(&self, env: &dyn Environment) -> Result<()>;
}

const HTTP: ProbeCase = ProbeCase {
    name: "http-reachability",
    fixtures: &[],
    probes: &[
        Probe::new("a", "http://b", 200).logged_by("b"),
        Probe::new("b", "http://a", 200).logged_by("a"),
        Probe::new("a", "http://c:80", 200).logged_by("c"),
        Probe::new("b", "http://d:8080", 200).logged_by("d"),
    ],
};

const GRPC: ProbeCase = ProbeCase {
    name: "grpc-reachability",
    fixtures: &[],
    probes: &[
        Probe::new("a", "grpc://b:70", 200).logged_by("b"),
        Probe::new("b", "grpc://a:70", 200).logged_by("a"),
    ],
};

const TCP: ProbeCase = ProbeCase {
    name: "tcp-reachability",
    fixtures: &[],
    probes: &[
        Probe::new("a", "tcp://b:90", 200),
        Probe::new("b", "tcp://a:90", 200),
    ],
};

const HEADLESS: ProbeCase = ProbeCase {
    name: "headless-reachability",
    fixtures: &[],
    probes: &[Probe::new("a", "http://headless:10090", 200)],
};

const INGRESS: ProbeCase = ProbeCase {
    name: "ingress",
    fixtures: &["ingress.yaml.tmpl"],
    probes: &[
        Probe::new("t", "http://istio-ingress.{ISTIO_NAMESPACE}/http", 200).logged_by("a"),
        Probe::new("t", "http://istio-ingress.{ISTIO_NAMESPACE}/pasta", 404),
    ],
};

const EGRESS: ProbeCase = ProbeCase {
    name: "egress-rules",
    fixtures: &["egress-rule-httpbin.yaml.tmpl"],
    probes: &[
        Probe::new("a", "http://httpbin.org/headers", 200),
        Probe::new("a", "http://www.wikipedia.org", 404),
    ],
};

const ROUTING: ProbeCase = ProbeCase {
    name: "routing-rules",
    fixtures: &["rule-default-route.yaml.tmpl"],
    probes: &[Probe::new("a", "http://c", 200).logged_by("c")],
};

const ROUTING_TO_EGRESS: ProbeCase = ProbeCase {
    name: "routing-to-egress",
    fixtures: &[
        "egress-rule-httpbin.yaml.tmpl",
        "rule-route-to-egress.yaml.tmpl",
    ],
    probes: &[Probe::new("a", "http://httpbin.org/get", 200)],
};

const ZIPKIN: ProbeCase = ProbeCase {
    name: "zipkin",
    fixtures: &[],
    probes: &[
        Probe::new("a", "http://b", 200).logged_by("b"),
        Probe::new("t", "http://zipkin.{ISTIO_NAMESPACE}:9411/api/v1/services", 200),
    ],
};

const AUTH_EXCLUSION: ProbeCase = ProbeCase {
    name: "auth-exclusion",
    fixtures: &["fake-control.yaml.tmpl"],
    probes: &[Probe::new("a", "http://fake-control:80", 200)],
};

const EXTERNAL_NAME: ProbeCase = ProbeCase {
    name: "kubernetes-external-name-services",
    fixtures: &["external-name-service.yaml.tmpl"],
    probes: &[Probe::new("a", "http://externalbin/get", 200)],
};

/// The cases run by every branch, in execution order
pub fn registry() -> Vec<Box<dyn TestCase>> {
    vec![
        Box::new(HTTP),
        Box::new(GRPC),
        Box::new(TCP),
        Box::new(HEADLESS),
        Box::new(INGRESS),
        Box::new(EGRESS),
        Box::new(ROUTING),
        Box::new(ROUTING_TO_EGRESS),
        Box::new(ZIPKIN),
        Box::new(AUTH_EXCLUSION),
        Box::new(EXTERNAL_NAME),
    ]
}
