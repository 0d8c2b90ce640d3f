use super::check_report;
use crate::output::print_report;
use mdm_core::client::MdmApi;
use mdm_core::orchestrator::Orchestrator;

/// Run one process by name, outside any stored orchestration.
pub fn run<A: MdmApi>(
    orchestrator: &Orchestrator<'_, A>,
    name: &str,
    process_type: &str,
    parameters: &str,
    json: bool,
) -> anyhow::Result<()> {
    let report = orchestrator.run_process(name, process_type, parameters);
    print_report(&report, json)?;
    check_report(&report)
}
