//! CLI command implementations.

use crate::config::{SpecgraphConfig, CONFIG_DIR};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use specgraph_core::{Node, NodeType};
use specgraph_graph::{ChangeRisk, Edge, GraphQueryService, LineageDirection, PlatformContext};
use std::path::Path;
use std::time::Duration;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Services for the planning commands, which need the entity specs.
fn open_context(root: &Path) -> Result<PlatformContext> {
    let config = SpecgraphConfig::load(root)?;
    Ok(PlatformContext::open(config.context_config(root))?)
}

/// Query service over the compiled graph only; spec files are not read.
fn open_query(root: &Path) -> Result<GraphQueryService> {
    let config = SpecgraphConfig::load(root)?;
    Ok(GraphQueryService::from_path(config.graph_path(root)))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_node_line(node: &Node) {
    println!(
        "  {} {} {}",
        node.node_type.to_string().yellow(),
        node.id.cyan(),
        format!("({})", node.label).dimmed()
    );
}

fn print_edge_line(edge: &Edge) {
    println!(
        "  {} {} {}  {}",
        edge.source.cyan(),
        format!("-{}->", edge.relation).dimmed(),
        edge.target.cyan(),
        edge.semantics.dimmed()
    );
}

fn risk_label(risk: ChangeRisk) -> colored::ColoredString {
    match risk {
        ChangeRisk::Low => risk.as_str().green(),
        ChangeRisk::Medium => risk.as_str().yellow(),
        ChangeRisk::High => risk.as_str().red().bold(),
        ChangeRisk::Unknown => risk.as_str().dimmed(),
    }
}

/// Initialize Specgraph in a directory.
pub fn init(path: &Path) -> Result<()> {
    if SpecgraphConfig::path(path).exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    let config = SpecgraphConfig::default();
    config.save(path)?;

    println!(
        "{} Initialized Specgraph in {}",
        "✓".green(),
        path.join(CONFIG_DIR).display()
    );
    println!(
        "  Put specs under {} and run {}",
        config.specs_dir.display().to_string().cyan(),
        "specgraph compile".cyan()
    );

    Ok(())
}

/// Compile the specs and write the graph document.
pub fn compile(root: &Path, output: Option<&Path>, json: bool) -> Result<()> {
    let config = SpecgraphConfig::load(root)?;
    let mut context_config = config.context_config(root);
    if let Some(output) = output {
        context_config.graph_path = output.to_path_buf();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Compiling specs...");

    let compiled = PlatformContext::open(context_config)
        .and_then(|mut context| {
            let output = context.compile_and_persist()?;
            Ok((output, context.store().path().to_path_buf()))
        });
    spinner.finish_and_clear();
    let (output, path) = compiled?;

    if json {
        return print_json(&serde_json::json!({
            "path": path,
            "version": output.graph.version,
            "nodes": output.graph.node_count(),
            "edges": output.graph.edge_count(),
            "rejected": output.rejected,
            "dropped": output.dropped,
        }));
    }

    println!(
        "{} Compiled {} nodes and {} edges into {}",
        "✓".green(),
        output.graph.node_count().to_string().cyan(),
        output.graph.edge_count().to_string().cyan(),
        path.display()
    );

    if !output.rejected.is_empty() {
        println!("\n{} skipped records:", "⚠".yellow());
        for record in output.rejected.iter().take(5) {
            println!("  {}", record);
        }
        if output.rejected.len() > 5 {
            println!("  ... and {} more", output.rejected.len() - 5);
        }
    }

    if !output.dropped.is_empty() {
        println!("\n{} unresolved references:", "⚠".yellow());
        for reference in output.dropped.iter().take(5) {
            println!("  {}", reference.to_string().red());
        }
        if output.dropped.len() > 5 {
            println!("  ... and {} more", output.dropped.len() - 5);
        }
    }

    Ok(())
}

/// Show graph statistics.
pub fn stats(root: &Path, json: bool) -> Result<()> {
    let query = open_query(root)?;
    let stats = query.get_stats()?;

    if json {
        return print_json(&stats);
    }

    println!("{}", "Graph".cyan().bold());
    println!("  Nodes: {}", stats.total_nodes.to_string().cyan());
    for (node_type, count) in &stats.nodes_by_type {
        println!("    {:<10} {}", node_type, count);
    }
    println!("  Edges: {}", stats.total_edges.to_string().cyan());
    for (relation, count) in &stats.edges_by_relation {
        println!("    {:<10} {}", relation, count);
    }

    Ok(())
}

/// Show one node.
pub fn node(root: &Path, id: &str, json: bool) -> Result<()> {
    let query = open_query(root)?;
    let Some(node) = query.get_node(id)? else {
        return Err(format!("Node '{}' not found in graph", id).into());
    };

    if json {
        return print_json(&node);
    }

    println!("{} {}", node.id.cyan().bold(), format!("[{}]", node.node_type).yellow());
    println!("  Label:       {}", node.label);
    println!("  Owner:       {}", node.metadata.owner);
    println!("  Criticality: {}", node.metadata.business_criticality);
    if let Some(count) = node.metadata.fields_count {
        println!("  Fields:      {}", count);
    }
    if let Some(sla) = &node.metadata.sla {
        println!("  SLA:         {}", sla);
    }
    if let Some(hook) = &node.status_source {
        println!("  Status:      {}", hook.dimmed());
    }

    Ok(())
}

/// Show edges touching a node.
pub fn edges(root: &Path, id: &str, json: bool) -> Result<()> {
    let query = open_query(root)?;
    let edges = query.get_edges_for_node(id)?;

    if json {
        return print_json(&edges);
    }

    println!("Incoming ({}):", edges.incoming.len());
    for edge in &edges.incoming {
        print_edge_line(edge);
    }
    println!("Outgoing ({}):", edges.outgoing.len());
    for edge in &edges.outgoing {
        print_edge_line(edge);
    }

    Ok(())
}

/// Walk the graph upstream or downstream from a node.
pub fn lineage(root: &Path, id: &str, direction: LineageDirection, json: bool) -> Result<()> {
    let query = open_query(root)?;
    let reached = query.get_lineage(id, direction)?;

    if json {
        return print_json(&serde_json::json!({
            "id": id,
            "direction": direction,
            "nodes": reached,
        }));
    }

    if reached.is_empty() {
        println!("No {} lineage for {}", direction, id.cyan());
        return Ok(());
    }

    println!("{} lineage of {}:", direction, id.cyan());
    for (position, reached_id) in reached.iter().enumerate() {
        println!("  {:>3}. {}", position + 1, reached_id);
    }

    Ok(())
}

/// Search nodes by id or label.
pub fn search(root: &Path, query: &str, limit: usize, json: bool) -> Result<()> {
    let service = open_query(root)?;
    let matches: Vec<Node> = service
        .search_nodes(query)?
        .into_iter()
        .take(limit)
        .collect();

    if json {
        return print_json(&matches);
    }

    if matches.is_empty() {
        println!("No matches found for \"{}\"", query);
        return Ok(());
    }

    println!("Found {} matches:\n", matches.len());
    for node in &matches {
        print_node_line(node);
    }

    Ok(())
}

/// List nodes, optionally of one type.
pub fn list(root: &Path, node_type: Option<&str>, json: bool) -> Result<()> {
    let query = open_query(root)?;

    let nodes = match node_type {
        Some(name) => {
            let Some(node_type) = NodeType::parse(name) else {
                return Err(format!("Unknown node type '{}'", name).into());
            };
            query.get_nodes_by_type(node_type)?
        }
        None => query.get_graph()?.nodes,
    };

    if json {
        return print_json(&nodes);
    }

    for node in &nodes {
        print_node_line(node);
    }
    println!("{} nodes", nodes.len());

    Ok(())
}

/// Everything affected by changing an entity.
pub fn impact(root: &Path, entity: &str, json: bool) -> Result<()> {
    let context = open_context(root)?;
    let dependencies = context.dependencies();
    let impact = dependencies.get_impact(entity);
    let risk = dependencies.analyze_change_risk(entity);

    if json {
        return print_json(&serde_json::json!({
            "entity": entity,
            "impact": impact,
            "risk": risk,
        }));
    }

    println!("{}", "Blast Radius".yellow().bold());
    println!("Target: {}  risk: {}", entity.cyan(), risk_label(risk));
    println!("Total: {} entities", impact.len().to_string().bold());
    for id in &impact {
        if id == entity {
            continue;
        }
        println!("  • {}", id);
    }

    Ok(())
}

/// Direct and transitive relationships of an entity.
pub fn deps(root: &Path, entity: &str, json: bool) -> Result<()> {
    let context = open_context(root)?;
    let Some(info) = context.dependencies().get_entity_info(entity) else {
        return Err(format!("Entity '{}' not found in specs", entity).into());
    };

    if json {
        return print_json(&info);
    }

    let join = |ids: &[String]| {
        if ids.is_empty() {
            "-".dimmed().to_string()
        } else {
            ids.join(", ")
        }
    };

    println!("{} ({})", info.name.cyan().bold(), info.id);
    println!("  Depends on:       {}", join(&info.depends_on));
    println!("  Depended by:      {}", join(&info.depended_by));
    println!("  All dependencies: {}", join(&info.all_dependencies));
    println!("  All dependents:   {}", join(&info.all_dependents));
    println!("  Total impact:     {}", info.total_impact);

    Ok(())
}

/// Rate the risk of changing an entity.
pub fn risk(root: &Path, entity: &str, json: bool) -> Result<()> {
    let context = open_context(root)?;
    let risk = context.dependencies().analyze_change_risk(entity);

    if json {
        return print_json(&serde_json::json!({ "entity": entity, "risk": risk }));
    }

    println!("{}: {}", entity.cyan(), risk_label(risk));
    Ok(())
}

/// Check whether two entities can change concurrently.
pub fn parallel(root: &Path, a: &str, b: &str, json: bool) -> Result<()> {
    let context = open_context(root)?;
    let allowed = context.dependencies().can_parallelize(a, b);

    if json {
        return print_json(&serde_json::json!({ "a": a, "b": b, "parallel": allowed }));
    }

    if allowed {
        println!("{} {} and {} can change in parallel", "✓".green(), a.cyan(), b.cyan());
    } else {
        println!("{} {} and {} must change in sequence", "✗".red(), a.cyan(), b.cyan());
    }
    Ok(())
}

/// In-flight changes that conflict with changing an entity.
pub fn conflicts(root: &Path, entity: &str, in_flight: &[String], json: bool) -> Result<()> {
    let context = open_context(root)?;
    let conflicts = context.dependencies().find_conflicts(entity, in_flight);

    if json {
        return print_json(&conflicts);
    }

    if conflicts.is_empty() {
        println!("{} No conflicts for {}", "✓".green(), entity.cyan());
        return Ok(());
    }

    println!("{} {} conflicts with:", "⚠".yellow(), entity.cyan());
    for id in &conflicts {
        println!("  • {}", id.red());
    }
    Ok(())
}

/// Order a batch of entity changes so dependencies land first.
pub fn order(root: &Path, entities: &[String], json: bool) -> Result<()> {
    let context = open_context(root)?;
    let dependencies = context.dependencies();

    let (ordered, safe) = match dependencies.try_change_order(entities) {
        Some(ordered) => (ordered, true),
        None => (dependencies.get_change_order(entities), false),
    };

    if json {
        return print_json(&serde_json::json!({ "order": ordered, "safe": safe }));
    }

    if !safe {
        println!(
            "{} Dependency cycle among these entities; keeping the given order",
            "⚠".yellow()
        );
    }
    for (position, id) in ordered.iter().enumerate() {
        println!("  {:>3}. {}", position + 1, id);
    }
    Ok(())
}

/// Report dependency cycles between entities.
pub fn cycles(root: &Path, json: bool) -> Result<()> {
    let context = open_context(root)?;
    let cycles = context.dependencies().find_cycles();

    if json {
        return print_json(&cycles);
    }

    if cycles.is_empty() {
        println!("{} No dependency cycles", "✓".green());
        return Ok(());
    }

    println!("{} {} dependency cycles:", "⚠".yellow(), cycles.len());
    for cycle in &cycles {
        println!("  {}", cycle.join(" ↔ ").red());
    }
    Ok(())
}

/// Print the entity dependency diagram in Mermaid syntax.
pub fn mermaid(root: &Path) -> Result<()> {
    let context = open_context(root)?;
    println!("{}", context.dependencies().visualize_mermaid());
    Ok(())
}
