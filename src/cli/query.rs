//! Query command implementation.
//!
//! One-shot run of the sync pipeline: resolve which entry the page
//! signals point at, fetch it, normalize, optionally attach edit tags,
//! map to the view model, print.

use std::fs;
use std::io::Write;

use anyhow::Result;
use serde_json::Value;

use crate::cli::args::QueryArgs;
use crate::config::Config;
use crate::content::{ContentRepository, EntryQuery, FileRepository};
use crate::entry::normalize;
use crate::log;
use crate::model::ContentSchema;
use crate::preview::resolve_target;
use crate::session::{MemoryHintStore, PageContext};

/// Execute query command
pub fn run_query(args: &QueryArgs, config: &Config) -> Result<()> {
    let content_type = args
        .content_type
        .as_deref()
        .unwrap_or(&config.site.content_type);
    let schema = ContentSchema::for_content_type(content_type)
        .ok_or_else(|| anyhow::anyhow!("no view model registered for '{content_type}'"))?;

    // Page context from --url / --preview; --preview alone acts as the
    // embedding-editor signal
    let ctx = match &args.url {
        Some(url) => PageContext::from_url(url, args.preview),
        None => PageContext {
            embedded: args.preview,
            ..PageContext::default()
        },
    };

    // One-shot commands have no session to carry hints between runs
    let hints = MemoryHintStore::new();
    let target = resolve_target(
        content_type,
        args.entry.as_deref(),
        &ctx,
        &hints,
        config.preview.enabled,
    );
    crate::debug!("query"; "resolved {:?}", target);

    let repo = FileRepository::new(&config.repository.content_dir);
    let query = match &target.entry_id {
        Some(id) => EntryQuery::by_id(id, &config.site.locale, target.mode),
        None => EntryQuery::latest(&config.site.locale, target.mode),
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let raw = rt.block_on(repo.fetch_entry(content_type, &query))?;

    let Some(raw) = raw else {
        log!("query"; "no entry published for '{content_type}'");
        return Ok(());
    };

    let mut entry = normalize(&raw, &schema.group_keys());

    if args.tags {
        crate::edit::annotate(&mut entry, schema, &config.site.locale);
    }

    let output_value = if args.raw {
        entry.as_value().clone()
    } else {
        match (schema.map)(&entry) {
            Some(model) => model.to_value(),
            None => {
                log!("query"; "entry {} has no content to map", entry.uid().unwrap_or("?"));
                return Ok(());
            }
        }
    };

    output_result(&output_value, args)
}

// ============================================================================
// Output Formatting
// ============================================================================

fn output_result(value: &Value, args: &QueryArgs) -> Result<()> {
    let formatted = if args.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    // Output to file or stdout
    if let Some(ref output_path) = args.output {
        let mut file = fs::File::create(output_path)?;
        writeln!(file, "{}", formatted)?;
        log!("query"; "wrote output to {}", output_path.display());
    } else {
        println!("{}", formatted);
    }

    Ok(())
}
