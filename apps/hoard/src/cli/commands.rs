//! # CLI Command Implementations

use crate::api::{self, EntityJson};
use crate::config::{Backend, HoardConfig};
use chrono::NaiveDate;
use hoard_core::{
    Catalog, Entity, EntityKind, HoardError, Money, NewItem, NewLocation, ParentRef,
    archive::{archive_digest, catalog_digest},
    delete_cascade, delete_tag, direct_child_counts, export_archive, import_archive,
    preview_archive, rename_tag, resolve_ancestor_path, tag_index, total_item_count, total_value,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// How results are printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    /// Machine-readable JSON instead of text.
    pub json: bool,
    /// Print per-record warnings and errors, not just counts.
    pub verbose: bool,
}

/// Arguments of `add-item`, as typed.
#[derive(Debug, Clone, Default)]
pub struct ItemArgs {
    pub name: Option<String>,
    pub parent: Option<String>,
    pub description: Option<String>,
    pub container: bool,
    pub quantity: i64,
    pub exclude: bool,
    pub tags: Vec<String>,
    pub price: Option<String>,
    pub value: Option<String>,
    pub acquired: Option<NaiveDate>,
}

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Canonicalize an input path and check it is a regular file within `max_size`.
fn validate_input_file(path: &Path, max_size: usize) -> Result<PathBuf, HoardError> {
    let canonical = path.canonicalize().map_err(|e| {
        HoardError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    if !canonical.is_file() {
        return Err(HoardError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| HoardError::Io(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > max_size as u64 {
        return Err(HoardError::Validation(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(canonical)
}

fn read_archive_file(path: &Path, max_size: usize) -> Result<Vec<u8>, HoardError> {
    let validated = validate_input_file(path, max_size)?;
    std::fs::read(&validated).map_err(|e| HoardError::Io(format!("Read file: {}", e)))
}

/// Resolve the output directory and keep the file name.
fn validate_output_path(path: &Path) -> Result<PathBuf, HoardError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        HoardError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    if !canonical_parent.is_dir() {
        return Err(HoardError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }
    let filename = path
        .file_name()
        .ok_or_else(|| HoardError::Io("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured catalog.
pub fn open_catalog(config: &HoardConfig) -> Result<Catalog, HoardError> {
    if config.backend == Backend::Memory {
        tracing::warn!("memory backend: changes are discarded when the command exits");
    }
    config.open_catalog()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), HoardError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| HoardError::Serialization(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Find a record by printed label, or fail.
fn resolve_label(catalog: &Catalog, label: &str) -> Result<Entity, HoardError> {
    catalog.resolve(label)?.ok_or_else(|| {
        HoardError::Validation(format!("no location or item matches label '{}'", label))
    })
}

fn parse_money(field: &str, text: &str) -> Result<Money, HoardError> {
    let (money, rounded) = Money::parse_decimal(text)
        .ok_or_else(|| HoardError::Validation(format!("{}: '{}' is not an amount", field, text)))?;
    if rounded {
        tracing::warn!(field, input = text, stored = %money, "amount rounded to cents");
    }
    Ok(money)
}

fn kind_marker(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Location => "[L]",
        EntityKind::Item => "[I]",
    }
}

fn print_entity_line(entity: &Entity) {
    match entity {
        Entity::Location(location) => {
            println!(
                "{} {}  {}",
                kind_marker(EntityKind::Location),
                location.id,
                location.name
            );
        }
        Entity::Item(item) => {
            let container = if item.can_hold_items { " (container)" } else { "" };
            println!(
                "{} {}  {} x{}{}",
                kind_marker(EntityKind::Item),
                item.id,
                item.display_name(),
                item.quantity,
                container
            );
        }
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(config: &HoardConfig) -> Result<(), HoardError> {
    let catalog = open_catalog(config)?;

    println!("Hoard Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.bind_address());
    println!("  Backend:  {}", config.backend);
    println!("  Database: {}", config.database.display());
    println!(
        "  Auth:     {}",
        if config.api_key().is_some() {
            "api key"
        } else {
            "none"
        }
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(config, catalog).await
}

// =============================================================================
// STATUS AND INIT
// =============================================================================

/// Show record counts.
pub fn cmd_status(config: &HoardConfig, out: Output) -> Result<(), HoardError> {
    let catalog = open_catalog(config)?;
    let stats = catalog.stats()?;

    if out.json {
        return print_json(&serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": config.backend.to_string(),
            "stats": stats,
        }));
    }

    println!("Hoard Catalog Status");
    println!("====================");
    println!("Database: {}", config.database.display());
    println!("Backend:  {}", config.backend);
    println!();
    println!("Locations:        {}", stats.locations);
    println!("  top level:      {}", stats.root_locations);
    println!("Items:            {}", stats.items);
    println!("  unassigned:     {}", stats.unassigned_items);

    catalog.close()
}

/// Create a new database file.
pub fn cmd_init(config: &HoardConfig, force: bool) -> Result<(), HoardError> {
    if config.backend != Backend::Redb {
        return Err(HoardError::Validation(
            "init only applies to the redb backend".to_string(),
        ));
    }
    if config.database.exists() {
        if !force {
            return Err(HoardError::Validation(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&config.database)
            .map_err(|e| HoardError::Io(format!("Remove old database: {}", e)))?;
    }

    Catalog::with_redb(&config.database)?.close()?;
    println!(
        "Initialized new redb database at {}",
        config.database.display()
    );
    Ok(())
}

// =============================================================================
// CREATE COMMANDS
// =============================================================================

/// Create a Location, optionally under another.
pub fn cmd_add_location(
    config: &HoardConfig,
    out: Output,
    name: String,
    parent: Option<&str>,
    description: Option<String>,
) -> Result<(), HoardError> {
    let mut catalog = open_catalog(config)?;
    let parent_id = match parent {
        Some(label) => match resolve_label(&catalog, label)? {
            Entity::Location(location) => Some(location.id),
            Entity::Item(item) => {
                return Err(HoardError::Validation(format!(
                    "{} is an item; locations can only be placed in locations",
                    item.id
                )));
            }
        },
        None => None,
    };

    let location = catalog.create_location(NewLocation {
        name,
        description,
        parent_id,
        photos: Vec::new(),
    })?;

    if out.json {
        print_json(&EntityJson::Location((&location).into()))?;
    } else {
        println!("Created location {}  {}", location.id, location.name);
    }
    catalog.close()
}

/// Create an Item in a Location, inside a container, or unassigned.
pub fn cmd_add_item(config: &HoardConfig, out: Output, args: ItemArgs) -> Result<(), HoardError> {
    let mut catalog = open_catalog(config)?;
    let parent = match args.parent.as_deref() {
        Some(label) => {
            let entity = resolve_label(&catalog, label)?;
            Some(ParentRef::new(entity.id().clone(), entity.kind()))
        }
        None => None,
    };
    let purchase_price = args
        .price
        .as_deref()
        .map(|p| parse_money("price", p))
        .transpose()?;
    let current_value = args
        .value
        .as_deref()
        .map(|v| parse_money("value", v))
        .transpose()?;

    let item = catalog.create_item(NewItem {
        name: args.name,
        description: args.description,
        parent,
        can_hold_items: args.container,
        quantity: args.quantity,
        include_in_total: !args.exclude,
        tags: args.tags,
        purchase_price,
        current_value,
        acquired_on: args.acquired,
        photos: Vec::new(),
    })?;

    if out.json {
        print_json(&EntityJson::Item((&item).into()))?;
    } else {
        println!("Created item {}  {}", item.id, item.display_name());
    }
    catalog.close()
}

// =============================================================================
// READ COMMANDS
// =============================================================================

/// Show one record with its ancestor path and, for holders, totals.
pub fn cmd_show(config: &HoardConfig, out: Output, label: &str) -> Result<(), HoardError> {
    let catalog = open_catalog(config)?;
    let entity = resolve_label(&catalog, label)?;
    let id = entity.id().clone();
    let kind = entity.kind();

    let path = resolve_ancestor_path(&catalog, &id, kind)?;
    let holds = match &entity {
        Entity::Location(_) => true,
        Entity::Item(item) => item.can_hold_items,
    };
    let totals = if holds {
        Some((
            direct_child_counts(&catalog, &id, kind)?,
            total_item_count(&catalog, &id, kind)?,
            total_value(&catalog, &id, kind)?,
        ))
    } else {
        None
    };

    if out.json {
        return print_json(&serde_json::json!({
            "record": EntityJson::from(&entity),
            "path": path,
            "totals": totals.map(|(children, count, value)| serde_json::json!({
                "children": children,
                "total_items": count,
                "value": value,
            })),
        }));
    }

    let trail: Vec<&str> = path.segments.iter().map(|s| s.name.as_str()).collect();
    println!("{} {}  {}", kind_marker(kind), id, entity.display_name());
    println!("Path:        {}", trail.join(" / "));
    if !path.complete {
        println!("             (incomplete: {} warning(s))", path.warnings.len());
    }

    match &entity {
        Entity::Location(location) => {
            if let Some(description) = &location.description {
                println!("Description: {}", description);
            }
            println!("Photos:      {}", location.photos.len());
        }
        Entity::Item(item) => {
            if let Some(description) = &item.description {
                println!("Description: {}", description);
            }
            println!("Quantity:    {}", item.quantity);
            println!(
                "In totals:   {}",
                if item.include_in_total { "yes" } else { "no" }
            );
            if !item.tags.is_empty() {
                let tags: Vec<&str> = item.tags.iter().map(String::as_str).collect();
                println!("Tags:        {}", tags.join(", "));
            }
            if let Some(price) = item.purchase_price {
                println!("Paid:        {}", price);
            }
            if let Some(value) = item.current_value {
                println!("Worth:       {}", value);
            }
            if let Some(date) = item.acquired_on {
                println!("Acquired:    {}", date);
            }
            println!("Photos:      {}", item.photos.len());
        }
    }

    if let Some((children, count, value)) = totals {
        println!();
        println!(
            "Contains:    {} location(s), {} item(s) directly",
            children.locations, children.items
        );
        println!("Total items: {}", count);
        if value.priced_items > 0 {
            println!(
                "Value:       {} paid, {} now ({} priced)",
                value.purchase, value.current, value.priced_items
            );
        }
    }

    if out.verbose {
        for warning in &path.warnings {
            println!("warning: {}", warning);
        }
    }
    catalog.close()
}

/// List the children of `parent`, or top-level records when none is given.
pub fn cmd_list(
    config: &HoardConfig,
    out: Output,
    parent: Option<&str>,
    kind: Option<EntityKind>,
) -> Result<(), HoardError> {
    let catalog = open_catalog(config)?;

    let entities: Vec<Entity> = match parent {
        Some(label) => {
            let parent = resolve_label(&catalog, label)?;
            catalog.list_by_parent(parent.id(), kind)?
        }
        None => {
            let mut top = Vec::new();
            if kind.is_none_or(|k| k == EntityKind::Location) {
                top.extend(catalog.root_locations()?.into_iter().map(Entity::Location));
            }
            if kind.is_none_or(|k| k == EntityKind::Item) {
                top.extend(catalog.unassigned_items()?.into_iter().map(Entity::Item));
            }
            top
        }
    };

    if out.json {
        let records: Vec<EntityJson> = entities.iter().map(EntityJson::from).collect();
        return print_json(&records);
    }

    if entities.is_empty() {
        println!("(nothing here)");
    }
    for entity in &entities {
        print_entity_line(entity);
    }
    catalog.close()
}

/// Search ids, names, descriptions and tags.
pub fn cmd_search(config: &HoardConfig, out: Output, query: &str) -> Result<(), HoardError> {
    let catalog = open_catalog(config)?;
    let results = catalog.search(query)?;

    if out.json {
        let records: Vec<EntityJson> = results.iter().map(EntityJson::from).collect();
        return print_json(&records);
    }

    println!("{} match(es) for '{}'", results.len(), query);
    for entity in &results {
        print_entity_line(entity);
    }
    catalog.close()
}

// =============================================================================
// DELETE COMMAND
// =============================================================================

/// Cascade-delete a record. Without `--yes` only reports what would go.
pub fn cmd_delete(
    config: &HoardConfig,
    out: Output,
    label: &str,
    yes: bool,
) -> Result<(), HoardError> {
    let mut catalog = open_catalog(config)?;
    let entity = resolve_label(&catalog, label)?;
    let id = entity.id().clone();
    let kind = entity.kind();

    if !yes {
        let children = direct_child_counts(&catalog, &id, kind)?;
        println!(
            "{} {} ({}) directly holds {} location(s) and {} item(s).",
            kind,
            id,
            entity.display_name(),
            children.locations,
            children.items
        );
        println!("Deleting it removes everything inside it.");
        return Err(HoardError::Validation(
            "refusing to delete without --yes".to_string(),
        ));
    }

    let report = delete_cascade(&mut catalog, kind, &id)?;

    if out.json {
        print_json(&report)?;
    } else {
        println!(
            "Removed {} location(s) and {} item(s)",
            report.removed_locations.len(),
            report.removed_items.len()
        );
        if !report.warnings.is_empty() {
            println!("{} warning(s)", report.warnings.len());
        }
        if out.verbose {
            for warning in &report.warnings {
                println!("warning: {}", warning);
            }
        }
        for failure in &report.errors {
            println!("not removed: {} {} ({})", failure.kind, failure.id, failure.reason);
        }
    }

    let complete = report.is_complete();
    catalog.close()?;
    if complete {
        Ok(())
    } else {
        Err(HoardError::Storage(format!(
            "{} record(s) could not be removed",
            report.errors.len()
        )))
    }
}

// =============================================================================
// TAG COMMANDS
// =============================================================================

/// List tags, most used first.
pub fn cmd_tags(config: &HoardConfig, out: Output) -> Result<(), HoardError> {
    let catalog = open_catalog(config)?;
    let tags = tag_index(&catalog)?;

    if out.json {
        return print_json(&tags);
    }
    if tags.is_empty() {
        println!("(no tags)");
    }
    for tag in &tags {
        println!("{:>5}  {}", tag.count, tag.tag);
    }
    catalog.close()
}

/// Rename a tag everywhere.
pub fn cmd_rename_tag(
    config: &HoardConfig,
    out: Output,
    from: &str,
    to: &str,
) -> Result<(), HoardError> {
    let mut catalog = open_catalog(config)?;
    let report = rename_tag(&mut catalog, from, to)?;

    if out.json {
        print_json(&report)?;
    } else {
        println!("Renamed '{}' to '{}' on {} item(s)", from, to, report.updated.len());
        for failure in &report.errors {
            println!("failed: {} ({})", failure.id, failure.reason);
        }
    }
    catalog.close()
}

/// Remove a tag everywhere.
pub fn cmd_delete_tag(config: &HoardConfig, out: Output, tag: &str) -> Result<(), HoardError> {
    let mut catalog = open_catalog(config)?;
    let report = delete_tag(&mut catalog, tag)?;

    if out.json {
        print_json(&report)?;
    } else {
        println!("Removed '{}' from {} item(s)", tag, report.updated.len());
        for failure in &report.errors {
            println!("failed: {} ({})", failure.id, failure.reason);
        }
    }
    catalog.close()
}

// =============================================================================
// ARCHIVE COMMANDS
// =============================================================================

/// Export the catalog to a zip archive.
pub fn cmd_export(config: &HoardConfig, out: Output, output: &Path) -> Result<(), HoardError> {
    let validated_output = validate_output_path(output)?;
    let catalog = open_catalog(config)?;
    let data = export_archive(&catalog)?;
    let digest = archive_digest(&data);

    std::fs::write(&validated_output, &data)
        .map_err(|e| HoardError::Io(format!("Write file: {}", e)))?;

    if out.json {
        print_json(&serde_json::json!({
            "path": validated_output.to_string_lossy(),
            "bytes": data.len(),
            "digest": digest,
        }))?;
    } else {
        println!(
            "Exported {} bytes to {}",
            data.len(),
            validated_output.display()
        );
        println!("BLAKE3: {}", digest);
    }
    catalog.close()
}

/// Validate an archive and show what it holds.
pub fn cmd_preview(config: &HoardConfig, out: Output, input: &Path) -> Result<(), HoardError> {
    let data = read_archive_file(input, config.max_archive_bytes)?;
    let preview = preview_archive(&data);

    if out.json {
        print_json(&preview)?;
    } else if preview.valid {
        println!("Archive is valid");
        if let Some(version) = preview.format_version {
            println!("  Format version: {}", version);
        }
        if let Some(exported_at) = preview.exported_at {
            println!("  Exported at:    {}", exported_at);
        }
        println!("  Locations:      {}", preview.counts.locations);
        println!("  Items:          {}", preview.counts.items);
        println!("  Photos:         {}", preview.counts.photos);
    } else {
        println!(
            "Archive is NOT valid: {}",
            preview.problem.as_deref().unwrap_or("unknown problem")
        );
    }

    if preview.valid {
        Ok(())
    } else {
        Err(HoardError::ArchiveFormat(
            preview.problem.unwrap_or_else(|| "invalid archive".to_string()),
        ))
    }
}

/// Import an archive, adding new records and replacing existing ones.
pub fn cmd_import(config: &HoardConfig, out: Output, input: &Path) -> Result<(), HoardError> {
    let data = read_archive_file(input, config.max_archive_bytes)?;
    let mut catalog = open_catalog(config)?;
    let result = import_archive(&mut catalog, &data)?;

    if out.json {
        print_json(&result)?;
    } else {
        println!("Imported format version {}", result.format_version);
        println!(
            "  Locations: {} added, {} updated, {} skipped",
            result.locations.added, result.locations.updated, result.locations.skipped
        );
        println!(
            "  Items:     {} added, {} updated, {} skipped",
            result.items.added, result.items.updated, result.items.skipped
        );
        println!("  Warnings:  {}", result.warnings.len());
        if out.verbose {
            for warning in &result.warnings {
                println!("    {}", warning);
            }
        }
        for failure in &result.errors {
            println!("  failed: {} {} ({})", failure.kind, failure.id, failure.reason);
        }
    }

    catalog.close()?;
    if result.success() {
        Ok(())
    } else {
        Err(HoardError::Storage(format!(
            "{} record(s) failed to import",
            result.errors.len()
        )))
    }
}

/// Print the BLAKE3 digest of an archive file, or of the catalog contents.
pub fn cmd_hash(config: &HoardConfig, out: Output, input: Option<&Path>) -> Result<(), HoardError> {
    let (subject, digest) = match input {
        Some(path) => {
            let data = read_archive_file(path, config.max_archive_bytes)?;
            ("archive", archive_digest(&data))
        }
        None => {
            let catalog = open_catalog(config)?;
            let digest = catalog_digest(&catalog)?;
            catalog.close()?;
            ("catalog", digest)
        }
    };

    if out.json {
        print_json(&serde_json::json!({
            "subject": subject,
            "algorithm": "BLAKE3",
            "hash": digest,
        }))
    } else {
        println!("BLAKE3 ({}): {}", subject, digest);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn redb_config(dir: &tempfile::TempDir) -> HoardConfig {
        HoardConfig {
            database: dir.path().join("hoard.redb"),
            ..HoardConfig::default()
        }
    }

    #[test]
    fn money_arguments_parse_to_cents() {
        assert_eq!(parse_money("price", "19.99").expect("parse"), Money::from_minor(1999));
        assert_eq!(parse_money("price", "3").expect("parse"), Money::from_minor(300));
        assert!(parse_money("price", "three").is_err());
    }

    #[test]
    fn output_path_keeps_filename() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = validate_output_path(&dir.path().join("backup.zip")).expect("valid");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("backup.zip"));
        assert!(validate_output_path(&dir.path().join("missing/backup.zip")).is_err());
    }

    #[test]
    fn oversized_input_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("big.zip");
        std::fs::write(&path, vec![0u8; 64]).expect("write");
        assert!(validate_input_file(&path, 128).is_ok());
        assert!(matches!(
            validate_input_file(&path, 32),
            Err(HoardError::Validation(_))
        ));
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = redb_config(&dir);
        cmd_init(&config, false).expect("first init");
        assert!(cmd_init(&config, false).is_err());
        cmd_init(&config, true).expect("forced init");
    }

    #[test]
    fn records_persist_between_commands() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = redb_config(&dir);
        let out = Output {
            json: true,
            verbose: false,
        };

        cmd_add_location(&config, out, "Garage".to_string(), None, None).expect("location");
        let garage = {
            let catalog = open_catalog(&config).expect("open");
            let roots = catalog.root_locations().expect("roots");
            catalog.close().expect("close");
            roots[0].id.clone()
        };

        cmd_add_item(
            &config,
            out,
            ItemArgs {
                name: Some("Ladder".to_string()),
                parent: Some(garage.as_str().to_ascii_lowercase()),
                quantity: 2,
                tags: vec!["tools".to_string()],
                price: Some("89.00".to_string()),
                ..ItemArgs::default()
            },
        )
        .expect("item");

        let catalog = open_catalog(&config).expect("open");
        assert_eq!(
            total_item_count(&catalog, &garage, EntityKind::Location).expect("total"),
            2
        );
        let value = total_value(&catalog, &garage, EntityKind::Location).expect("value");
        assert_eq!(value.purchase, Money::from_minor(17_800));
    }

    #[test]
    fn delete_requires_confirmation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = redb_config(&dir);
        let out = Output::default();

        cmd_add_location(&config, out, "Shed".to_string(), None, None).expect("location");
        let shed = {
            let catalog = open_catalog(&config).expect("open");
            let roots = catalog.root_locations().expect("roots");
            catalog.close().expect("close");
            roots[0].id.clone()
        };

        assert!(cmd_delete(&config, out, shed.as_str(), false).is_err());
        cmd_delete(&config, out, shed.as_str(), true).expect("delete");

        let catalog = open_catalog(&config).expect("open");
        assert_eq!(catalog.stats().expect("stats").locations, 0);
    }

    #[test]
    fn export_then_import_into_second_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = redb_config(&dir);
        let target = HoardConfig {
            database: dir.path().join("restored.redb"),
            ..HoardConfig::default()
        };
        let out = Output {
            json: true,
            verbose: false,
        };
        let archive = dir.path().join("backup.zip");

        cmd_add_location(&source, out, "Loft".to_string(), None, None).expect("location");
        cmd_export(&source, out, &archive).expect("export");
        cmd_preview(&target, out, &archive).expect("preview");
        cmd_import(&target, out, &archive).expect("import");

        let catalog = open_catalog(&target).expect("open");
        assert_eq!(catalog.stats().expect("stats").locations, 1);
    }
}
