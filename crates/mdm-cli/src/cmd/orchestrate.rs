use super::{check_report, RunExit};
use crate::output::print_report;
use anyhow::Context;
use mdm_core::client::MdmApi;
use mdm_core::orchestrator::Orchestrator;

pub fn run<A: MdmApi>(
    orchestrator: &Orchestrator<'_, A>,
    code: &str,
    json: bool,
) -> anyhow::Result<()> {
    let report = match orchestrator.orchestrate(code) {
        Ok(report) => report,
        Err(e) => {
            if let Some(exit) = RunExit::rejected(code, &e) {
                return Err(exit.into());
            }
            return Err(e).with_context(|| format!("failed to run orchestration '{code}'"));
        }
    };

    print_report(&report, json)?;
    check_report(&report)
}
