//! Scan command - one-shot project discovery.

use std::path::PathBuf;

use crate::config::Settings;
use crate::project::{ProjectRegistry, WorkspaceProjects};

pub async fn run(config: &Settings, path: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let root = super::workspace_root(config, path);
    if !root.is_dir() {
        anyhow::bail!("Workspace root {} is not a directory", root.display());
    }

    let registry = WorkspaceProjects::new();
    registry.scan(&root, &super::excluder(config, &root)).await;

    let projects = registry.all_projects().await;
    if json {
        for project in &projects {
            println!("{}", serde_json::to_string(project)?);
        }
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects found in {}", root.display());
        return Ok(());
    }

    println!("Projects in {}:", root.display());
    for project in &projects {
        let rel = project.root.strip_prefix(&root).unwrap_or(&project.root);
        match &project.app_type {
            Some(kind) => println!("  {:<40} {} [{kind}]", project.name(), rel.display()),
            None => println!("  {:<40} {}", project.name(), rel.display()),
        }
    }
    Ok(())
}
