use colored::Colorize;
use mrml::commands::{CmdMessage, MessageLevel, NodeSummary};

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

pub(super) fn print_nodes(nodes: &[NodeSummary]) {
    if nodes.is_empty() {
        println!("No nodes found.");
        return;
    }

    let id_width = nodes.iter().map(|n| n.id.len()).max().unwrap_or(0);
    for node in nodes {
        let name = node.name.as_deref().unwrap_or("");
        let id = format!("{:<width$}", node.id, width = id_width);
        println!("{}  {}  {}", id.yellow(), node.class.dimmed(), name.bold());
        for (role, targets) in &node.references {
            let shown: Vec<String> = targets
                .iter()
                .map(|t| {
                    if t.is_empty() {
                        "(unresolved)".red().to_string()
                    } else {
                        t.clone()
                    }
                })
                .collect();
            println!("{:<width$}    {} -> {}", "", role.cyan(), shown.join(", "), width = id_width);
        }
    }
}
