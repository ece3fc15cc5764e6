// ABOUTME: Deployment commands: deploy, stop, delete, restart, get, list, logs.
// ABOUTME: Each one is a single ControlPlane call whose result goes through Output.

use voyager::control::{ControlPlane, ListFilter};
use voyager::deployment::{Deployment, DeploymentMode};
use voyager::error::Result;
use voyager::output::Output;
use voyager::types::DeploymentId;

pub async fn deploy(
    control: &ControlPlane,
    source: &str,
    mode: DeploymentMode,
    subdomain: &str,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Deploying {} as {} ({})", source, subdomain, mode));
    let result = control.deploy(source, mode, subdomain).await;
    output.report(result, "deployed", |d| {
        format!("Deployed {} at {} (port {})", d.id(), d.url(), d.host_port())
    })?;
    Ok(())
}

pub async fn stop(control: &ControlPlane, id: &str, mut output: Output) -> Result<()> {
    output.start_timer();
    let result = control.stop(&DeploymentId::new(id)).await;
    output.report(result, "stopped", |d| format!("Stopped {}", d.id()))?;
    Ok(())
}

pub async fn delete(
    control: &ControlPlane,
    id: &str,
    stop_first: bool,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let id = DeploymentId::new(id);
    let result = if stop_first {
        control.stop_and_delete(&id).await
    } else {
        control.delete(&id).await
    };
    let diagnostics = output.report(
        result.map(|d| d.warnings().iter().map(|w| w.message.clone()).collect::<Vec<_>>()),
        "deleted",
        |_| format!("Deleted {}", id),
    )?;
    for warning in &diagnostics {
        output.warning(warning);
    }
    Ok(())
}

pub async fn restart(control: &ControlPlane, id: &str, mut output: Output) -> Result<()> {
    output.start_timer();
    let result = control.restart(&DeploymentId::new(id)).await;
    output.report(result, "restarted", |d| format!("Restarted {}", d.id()))?;
    Ok(())
}

pub async fn get(control: &ControlPlane, id: &str, output: Output) -> Result<()> {
    let result = control.get(&DeploymentId::new(id)).await;
    output.report(result, "found", describe)?;
    Ok(())
}

pub async fn list(control: &ControlPlane, filter: ListFilter, output: Output) -> Result<()> {
    let result = control.list(filter).await;
    output.report(result, "listed", |deployments| {
        if deployments.is_empty() {
            return "No deployments".to_string();
        }
        deployments
            .iter()
            .map(|d| format!("{}  {:<10} {:<10} {}", d.id(), d.mode(), d.state(), d.host()))
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    Ok(())
}

pub async fn logs(control: &ControlPlane, id: &str, output: Output) -> Result<()> {
    let result = control.logs(&DeploymentId::new(id)).await;
    output.report(result, "logs", |lines| lines.join("\n"))?;
    Ok(())
}

fn describe(d: &Deployment) -> String {
    format!(
        "id:        {}\nmode:      {}\nstate:     {}\nhost:      {}\nport:      {}\ncontainer: {}\ndns:       {}\nsource:    {}\ncreated:   {}",
        d.id(),
        d.mode(),
        d.state(),
        d.host(),
        d.host_port(),
        d.container_id(),
        d.dns_record_id(),
        d.source_directory().display(),
        d.created_at().to_rfc3339(),
    )
}
