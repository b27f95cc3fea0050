use colored::Colorize;
use sweeper_core::ResourceType;

pub fn handle() {
    println!("{}", format!("{:<22} {}", "TYPE", "DESCRIPTION").bold());
    println!("{}", "─".repeat(50).dimmed());
    for resource_type in ResourceType::ALL {
        println!(
            "{} {}",
            format!("{:<22}", resource_type.as_str()).cyan(),
            resource_type.display_name()
        );
    }
}
