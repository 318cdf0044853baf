//! `ecore-proxy demo` - exercise the built-in model on the in-memory heap.

use std::path::Path;

use anyhow::{ensure, Result};
use ecore_proxy::model::{self, JobOutputOptions, ListOptionsValues, OptionValue};
use ecore_proxy::{Bridge, BridgeConfig, ProxyType, TypedCollection};

pub fn execute(config: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    let (bridge, heap) = Bridge::in_memory(model::package()?, config);

    {
        // The list references its options; they stay owned here
        let mut owned = Vec::new();
        let options = ListOptionsValues::new(&bridge)?;
        for (name, value) in [("VISHNU_CLOSE_POLICY", "1"), ("VISHNU_TIMEOUT", "3600")] {
            let option = OptionValue::new(&bridge)?;
            option.set_option_name(name)?;
            option.set_value(value)?;
            options.option_values()?.push_back(&option)?;
            owned.push(option);
        }
        print_options(&options)?;

        let outputs = JobOutputOptions::new(&bridge)?;
        outputs.set_machine_id("MA_1")?;
        outputs.set_output_dir("/tmp/outputs")?;
        outputs.set_days(7)?;
        println!(
            "JobOutputOptions: machine={} dir={} days={}",
            outputs.machine_id()?,
            outputs.output_dir()?,
            outputs.days()?
        );

        let copy: JobOutputOptions = outputs.duplicate()?;
        copy.set_days(30)?;
        ensure!(outputs.days()? == 7, "copy shares state with its source");

        let scratch = TypedCollection::<OptionValue>::new(&bridge)?;
        scratch.insert_all(&*options.option_values()?)?;
        println!("Copied {} option handles", scratch.size()?);

        drop(options);
        ensure!(
            owned.iter().all(|option| heap.is_live(option.proxy().raw_handle())),
            "destroying the list owner destroyed its elements"
        );
        println!("Live before release: {}", heap.stats().live);
    }

    let stats = heap.stats();
    println!(
        "Heap: live={} created={} destroyed={}",
        stats.live, stats.created, stats.destroyed
    );
    ensure!(stats.live == 0, "{} native objects leaked", stats.live);
    Ok(())
}

fn print_options(options: &ListOptionsValues<'_>) -> Result<()> {
    let values = options.option_values()?;
    println!("ListOptionsValues ({} entries):", values.size()?);
    for option in values.iter()? {
        if let Some(option) = option? {
            println!("  {} = {}", option.option_name()?, option.value()?);
        }
    }
    Ok(())
}
