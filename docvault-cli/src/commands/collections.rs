use docvault::BackupEngine;

/// Print the registry in restore order with its hooks.
pub fn run_collections(engine: &BackupEngine) {
    println!();
    println!("{:<4} {:<20} {:<20} Hooks", "#", "Key", "Collection");
    println!("{}", "-".repeat(70));

    for (index, descriptor) in engine.registry().iter().enumerate() {
        let hooks: Vec<String> = descriptor
            .export_hook()
            .map(|h| h.describe())
            .into_iter()
            .chain(descriptor.import_hook().map(|h| h.describe()))
            .collect();

        println!(
            "{:<4} {:<20} {:<20} {}",
            index + 1,
            descriptor.key(),
            descriptor.accessor().name(),
            hooks.join("; ")
        );
    }
}
