//! docrefit CLI - batch DOCX layout refitting

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docrefit::{
    collect_inputs_from_path, BatchJob, BatchResult, DocxPackage, InputDoc, RefitConfig,
    StyleCatalog,
};

#[derive(Parser)]
#[command(name = "docrefit")]
#[command(version)]
#[command(about = "Batch-apply a new layout template to legacy DOCX documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refit documents and write the output archive
    Run {
        /// Input .docx files and/or .zip archives of .docx files
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// New-layout template document (bundled default if omitted)
        #[arg(short, long, value_name = "FILE")]
        template: Option<PathBuf>,

        /// YAML configuration for mappings/replacements
        #[arg(short, long, value_name = "FILE", env = "DOCREFIT_CONFIG")]
        config: Option<PathBuf>,

        /// Output archive path
        #[arg(short, long, value_name = "FILE", default_value = "refitted.zip")]
        output: PathBuf,

        /// Print the batch summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the bundled default template
    Template {
        /// Output file
        #[arg(short, long, value_name = "FILE", default_value = "template.docx")]
        output: PathBuf,
    },

    /// Show a document's paragraph and style summary
    Inspect {
        /// Input .docx file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            inputs,
            template,
            config,
            output,
            json,
        } => cmd_run(&inputs, template.as_deref(), config.as_deref(), &output, json),
        Commands::Template { output } => cmd_template(&output),
        Commands::Inspect { input } => cmd_inspect(&input),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn cmd_run(
    input_paths: &[PathBuf],
    template: Option<&std::path::Path>,
    config: Option<&std::path::Path>,
    output: &std::path::Path,
    json: bool,
) -> docrefit::Result<ExitCode> {
    let config = match config {
        Some(path) => RefitConfig::from_yaml_file(path)?,
        None => RefitConfig::default(),
    };
    let template_bytes = template.map(fs::read).transpose()?;
    let job = BatchJob::new(template_bytes.as_deref(), config)?;

    let mut inputs: Vec<InputDoc> = Vec::new();
    for path in input_paths {
        inputs.extend(collect_inputs_from_path(path)?);
    }
    if inputs.is_empty() {
        eprintln!("{}", "no .docx inputs found".yellow());
        return Ok(ExitCode::FAILURE);
    }

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .expect("static template is valid"),
    );
    bar.set_message(format!("refitting {} document(s)...", inputs.len()));
    bar.enable_steady_tick(Duration::from_millis(100));

    let result = job.run(&inputs)?;
    bar.finish_and_clear();

    fs::write(output, &result.archive)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.summary).expect("summary serializes"));
    } else {
        print_summary(&result, output);
    }

    Ok(if result.summary.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(result: &BatchResult, output: &std::path::Path) {
    for file in &result.summary.succeeded {
        println!("{} {} -> {}", "✓".green(), file.input, file.output);
        for warning in &file.warnings {
            println!("  {} {warning}", "warning:".yellow());
        }
    }
    for file in &result.summary.failed {
        println!("{} {} ({})", "✗".red(), file.input, file.reason);
    }
    println!(
        "\n{} of {} refitted -> {}",
        result.summary.succeeded.len(),
        result.summary.total(),
        output.display()
    );
}

fn cmd_template(output: &std::path::Path) -> docrefit::Result<ExitCode> {
    let bytes = docrefit::build_default_template()?;
    fs::write(output, bytes)?;
    println!("{} wrote {}", "✓".green(), output.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_inspect(input: &std::path::Path) -> docrefit::Result<ExitCode> {
    let bytes = fs::read(input)?;
    let pkg = DocxPackage::open_bytes(&bytes)?;
    let doc = pkg.document()?;
    let body = docrefit::docx::document::body(&doc)?;

    let paragraphs: Vec<_> = body.children_named("w:p").collect();
    let tables = body.descendants().filter(|e| e.name == "w:tbl").count();
    let catalog = StyleCatalog::from_package(&pkg)?;

    println!("{}", input.display().to_string().bold());
    println!("  paragraphs: {}", paragraphs.len());
    println!("  tables:     {tables}");
    println!("  styles:     {}", catalog.len());

    let mut usage: Vec<(String, usize)> = Vec::new();
    for p in &paragraphs {
        let id = docrefit::docx::document::paragraph_style_id(p).unwrap_or("(none)");
        let name = catalog
            .resolve(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.to_string());
        match usage.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 += 1,
            None => usage.push((name, 1)),
        }
    }
    for (name, count) in usage {
        println!("    {count:>4}  {name}");
    }
    Ok(ExitCode::SUCCESS)
}
