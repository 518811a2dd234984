pub mod catalog;
pub mod color;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod execute;
pub mod invariant;
pub mod locator;
pub mod models;
pub mod probe;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod suite;
pub mod testutil;
pub mod traits;
pub mod wait;

pub use catalog::{Locale, Provider, SuiteConfig, ThemeConfig};
pub use color::Rgb;
pub use config::{RunConfig, SessionMode};
pub use error::VerifyError;
pub use execute::ScenarioExecutor;
pub use invariant::{ElementInvariant, LocationInvariant, Pattern, ResponseInvariant, Verdict};
pub use locator::{Locator, LocatorChain};
pub use models::{NavigationResponse, Readiness, Target, TargetKind};
pub use probe::{EvidenceRequest, Probe, ProbeResult};
pub use report::{Outcome, OutcomeStatus, RunReport, Summary};
pub use runner::{RunEvent, RunReporter, Runner, TracingRunReporter};
pub use scenario::{Action, Check, CheckSpec, NavigationPolicy, Presence, Scenario, Step};
pub use suite::{SuiteGroup, build_suite};
pub use traits::{Session, SessionFactory};
pub use wait::{WaitOutcome, WaitPolicy, bounded_wait};
