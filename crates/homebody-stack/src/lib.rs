//! HomeBody infrastructure stack
//!
//! A single web server reachable over SSH/HTTP/HTTPS, a key-value table for
//! appliance records, and an `A` record for `ask-frank.shop` pointing at the
//! server.

pub mod compute;
pub mod dns;
pub mod storage;

pub use compute::WebServer;

use homebody_aws::{ARecord, HostedZone, Table};
use homebody_cloud::{Context, Result, Stack, StackProps, Template};

/// The built stack together with handles to what it declares
#[derive(Debug, Clone)]
pub struct InfraStack {
    stack: Stack,
    pub web_server: WebServer,
    pub table: Table,
    pub zone: HostedZone,
    pub record: ARecord,
}

impl InfraStack {
    /// Declare the whole stack. Never fails; problems surface at synth.
    pub fn build(id: &str, props: StackProps, context: &Context) -> Self {
        let mut stack = Stack::new(id, props, context.clone());

        let web_server = compute::create_web_server(&mut stack);
        let table = storage::create_table(&mut stack);
        let (zone, record) = dns::bind_dns(&mut stack, &web_server.instance);

        tracing::info!(
            stack = %id,
            resources = stack.resources().count(),
            missing_context = stack.missing_context().len(),
            "Built stack"
        );

        Self {
            stack,
            web_server,
            table,
            zone,
            record,
        }
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }

    pub fn synthesize(&self) -> Result<Template> {
        self.stack.synthesize()
    }
}

#[cfg(test)]
mod tests;
