use anyhow::Result;
use clap::ValueEnum;
use clustermon_core::{ClusterConfig, ClusterError, MutationReport, NodeState};
use clustermon_monitor::{ClusterSnapshot, RefreshReport};
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
    Table,
}

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Term")]
    term: u64,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "This node")]
    local: String,
}

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "From")]
    source: String,
    #[tabled(rename = "To")]
    target: String,
    #[tabled(rename = "Status")]
    status: String,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_snapshot(snapshot: &ClusterSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(snapshot)?,
        OutputFormat::Pretty => print_snapshot_pretty(snapshot),
        OutputFormat::Table => print_snapshot_table(snapshot),
    }
    Ok(())
}

fn print_snapshot_pretty(snapshot: &ClusterSnapshot) {
    if !snapshot.model.has_cluster {
        println!("{}", "No cluster configured".yellow().bold());
        if let Some(node) = &snapshot.current_node {
            println!("  This node: {} ({})", node.address, node.endpoint);
        }
        return;
    }

    match snapshot.leader() {
        Some(leader) => println!(
            "{} {} (term {})",
            "Leader:".bold(),
            leader.address.green(),
            leader.term
        ),
        None => println!("{} {}", "Leader:".bold(), "election in progress".yellow()),
    }

    println!("{}", "Nodes:".bold());
    for node in &snapshot.model.nodes {
        let marker = if is_current(snapshot, &node.address) { "*" } else { " " };
        println!(
            " {} {:<24} {:<14} {}",
            marker,
            node.address,
            colored_state(&node.node_state),
            node.endpoint
        );
    }

    if !snapshot.model.links.is_empty() {
        println!("{}", "Replication:".bold());
        for link in &snapshot.model.links {
            println!("   {} -> {} [{}]", link.source, link.target, link.status);
        }
    }
}

fn print_snapshot_table(snapshot: &ClusterSnapshot) {
    let nodes: Vec<NodeRow> = snapshot
        .model
        .nodes
        .iter()
        .map(|node| NodeRow {
            address: node.address.clone(),
            state: node.node_state.to_string(),
            term: node.term,
            endpoint: node.endpoint.clone(),
            local: if is_current(snapshot, &node.address) {
                "yes".into()
            } else {
                String::new()
            },
        })
        .collect();
    println!("{}", Table::new(nodes));

    let links: Vec<LinkRow> = snapshot
        .model
        .links
        .iter()
        .map(|link| LinkRow {
            source: link.source.clone(),
            target: link.target.clone(),
            status: link.status.to_string(),
        })
        .collect();
    if !links.is_empty() {
        println!("{}", Table::new(links));
    }
}

/// One line per redraw in `watch` mode.
pub fn summary_line(snapshot: &ClusterSnapshot) -> String {
    let time = snapshot
        .refreshed_at
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    if !snapshot.model.has_cluster {
        return format!("[{time}] no cluster");
    }
    let leader = snapshot
        .leader()
        .map(|leader| leader.address.as_str())
        .unwrap_or("<none>");
    format!(
        "[{}] {} nodes, leader {}, {} active links{}",
        time,
        snapshot.model.nodes.len(),
        leader,
        snapshot.model.links.len(),
        if snapshot.leader_changed { " (leader changed)" } else { "" }
    )
}

pub fn print_config(config: &ClusterConfig, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(config);
    }
    println!("{}", "Cluster configuration:".bold());
    println!("  election min timeout:     {} ms", config.election_min_timeout);
    println!("  election range timeout:   {} ms", config.election_range_timeout);
    println!("  heartbeat interval:       {} ms", config.heartbeat_interval);
    println!("  message size:             {} KB", config.message_size_kb);
    println!("  verification timeout:     {} ms", config.verification_timeout);
    println!("  transaction log max size: {} GB", config.transaction_log_maximum_size_gb);
    println!("  nodes:                    {}", config.nodes.join(", "));
    Ok(())
}

pub fn print_mutation(operation: &str, report: &MutationReport, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(report);
    }
    match report {
        MutationReport::Success { nodes } => {
            println!("{} {} ({} nodes)", "✓".green(), operation, nodes.len());
        }
        MutationReport::PartialFailure { succeeded, failed } => {
            println!(
                "{} {} partially failed ({} ok, {} failed)",
                "!".yellow().bold(),
                operation,
                succeeded.len(),
                failed.len()
            );
            for failure in failed {
                println!("    {}", failure.to_string().red());
            }
        }
    }
    Ok(())
}

pub fn print_refresh_errors(report: &RefreshReport) {
    for error in &report.errors {
        print_error("refresh", error);
    }
}

pub fn print_error(operation: &str, error: &ClusterError) {
    eprintln!("{} {} failed", "✗".red().bold(), operation);
    for line in error.lines() {
        eprintln!("    {}", line.red());
    }
}

fn is_current(snapshot: &ClusterSnapshot, address: &str) -> bool {
    snapshot
        .current_node
        .as_ref()
        .is_some_and(|node| node.address == address)
}

fn colored_state(state: &NodeState) -> colored::ColoredString {
    let text = state.as_str();
    match state {
        NodeState::Leader => text.green().bold(),
        NodeState::Follower => text.green(),
        NodeState::Candidate => text.yellow(),
        NodeState::OutOfSync | NodeState::Restricted | NodeState::ReadOnly => text.yellow(),
        NodeState::NoConnection | NodeState::NoCluster => text.red(),
        NodeState::Other(_) => text.normal(),
    }
}
