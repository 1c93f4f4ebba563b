#![warn(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use acrofill::configuration::Configuration;
use acrofill::conversion::PdfRestClient;
use acrofill::error::ContextError;
use acrofill::filler::ValueMap;
use acrofill::form::PdfForm;
use acrofill::pipeline::{self, BatchSummary, FillOptions};
use acrofill::{storage, template};

/// The values of the IRS Form 2848 (Power of Attorney), used when no data file is given.
const SAMPLE_DATA: &str = include_str!("../assets/form2848-data.json");

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CliArguments {
    /// A JSON configuration file, its settings are overridden by the environment variables.
    #[arg(long = "config", value_name = "json_file", global = true)]
    configuration_path: Option<PathBuf>,
    /// Log the field names of every form and the details of every step.
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the fields of a form and print an example data file for it
    #[command(short_flag = 'l')]
    List {
        input: PathBuf,
        /// Also write the example data file to this path
        #[arg(long, value_name = "json_file")]
        template: Option<PathBuf>,
    },
    /// Fill an AcroForm document with the values of a data file
    Fill {
        input: PathBuf,
        output: PathBuf,
        /// Defaults to the bundled Form 2848 sample data
        data: Option<PathBuf>,
        #[arg(long)]
        flatten: bool,
        /// Write the outcome of every value to this JSON file
        #[arg(long, value_name = "json_file")]
        report: Option<PathBuf>,
    },
    /// Convert an XFA document into an AcroForm document, then fill it
    #[command(short_flag = 's')]
    Single {
        input: PathBuf,
        output: PathBuf,
        data: PathBuf,
        /// Use `true` to make the form non-editable after filling
        flatten: Option<String>,
    },
    /// Convert then fill every PDF document of a directory
    #[command(short_flag = 'b')]
    Batch {
        input_directory: PathBuf,
        output_directory: PathBuf,
        data: PathBuf,
        /// Use `true` to make the forms non-editable after filling
        flatten: Option<String>,
    },
    /// Convert an XFA document into an AcroForm document
    Convert { input: PathBuf, output: PathBuf },
    /// Convert every PDF document of a directory
    ConvertBatch {
        input_directory: PathBuf,
        output_directory: PathBuf,
    },
    /// Write the bundled Form 2848 sample data file
    SampleData {
        #[arg(default_value = "form2848-data.json")]
        output: PathBuf,
    },
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    let arguments = CliArguments::parse();
    let configuration = match &arguments.configuration_path {
        Some(configuration_path) => Configuration::from_path(configuration_path),
        None => Ok(Configuration::default()),
    }
    .map(|configuration| configuration.with_environment(|name| std::env::var(name).ok()));

    let debug = arguments.debug
        || configuration
            .as_ref()
            .is_ok_and(|configuration| configuration.debug);
    env_logger::builder()
        .filter_level(if debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();
    log::debug!("{:?}", arguments);
    let configuration = configuration?;

    let fill_options = |flatten: bool| FillOptions {
        flatten: flatten || configuration.flatten,
        list_fields: debug,
        output_prefix: configuration.output_prefix.clone(),
    };

    match arguments.command {
        Command::List { input, template } => list_fields(&input, template.as_deref()),
        Command::Fill {
            input,
            output,
            data,
            flatten,
            report,
        } => {
            let values = match data {
                Some(data) => pipeline::load_value_map(&data)?,
                None => {
                    log::info!("No data file given, using the bundled Form 2848 sample data");
                    sample_values()?
                }
            };
            let application_report =
                pipeline::fill_file(&input, &output, &values, &fill_options(flatten))?;
            if let Some(report) = report {
                let report_bytes = serde_json::to_vec_pretty(&application_report).map_err(|error| {
                    ContextError::with_error("Failed to serialize the report", &error)
                })?;
                storage::write_all(&report, &report_bytes)?;
                log::info!("Saved the report to the path: {:?}", report);
            }
            Ok(())
        }
        Command::Single {
            input,
            output,
            data,
            flatten,
        } => {
            let values = pipeline::load_value_map(&data)?;
            let converter = converter(&configuration)?;
            pipeline::convert_and_fill_file(
                &converter,
                &input,
                &output,
                &values,
                &fill_options(flatten.as_deref() == Some("true")),
            )?;
            Ok(())
        }
        Command::Batch {
            input_directory,
            output_directory,
            data,
            flatten,
        } => {
            let values = pipeline::load_value_map(&data)?;
            let converter = converter(&configuration)?;
            let summary = pipeline::batch_fill(
                &converter,
                &input_directory,
                &output_directory,
                &values,
                &fill_options(flatten.as_deref() == Some("true")),
            )?;
            log_failures(&summary);
            Ok(())
        }
        Command::Convert { input, output } => {
            pipeline::convert_file(&converter(&configuration)?, &input, &output)
        }
        Command::ConvertBatch {
            input_directory,
            output_directory,
        } => {
            let summary = pipeline::batch_convert(
                &converter(&configuration)?,
                &input_directory,
                &output_directory,
            )?;
            log_failures(&summary);
            Ok(())
        }
        Command::SampleData { output } => {
            storage::write_all(&output, SAMPLE_DATA.as_bytes())?;
            log::info!("Created {:?} with sample data", output);
            log::info!(
                "Now run: acrofill fill form2848_acroform.pdf filled_form2848.pdf {}",
                output.display()
            );
            Ok(())
        }
    }
}

/// Prints the fields of the form followed by an example data file.
fn list_fields(input: &Path, template_path: Option<&Path>) -> Result<(), ContextError> {
    let form = PdfForm::load(&storage::read_all(input)?)?;
    let directory = form.directory();

    println!("Form Fields:");
    for description in template::describe(&directory) {
        println!("- {} ({})", description.name, description.kind);
    }

    let template = serde_json::to_string_pretty(&template::derive_template(&directory))
        .map_err(|error| ContextError::with_error("Failed to serialize the template", &error))?;
    println!("\nExample JSON template:");
    println!("{}", template);

    if let Some(template_path) = template_path {
        storage::write_all(template_path, template.as_bytes())?;
        log::info!("Saved the template to the path: {:?}", template_path);
    }
    Ok(())
}

fn sample_values() -> Result<ValueMap, ContextError> {
    serde_json::from_str(SAMPLE_DATA)
        .map_err(|error| ContextError::with_error("Failed to parse the bundled sample data", &error))
}

fn converter(configuration: &Configuration) -> Result<PdfRestClient, ContextError> {
    PdfRestClient::new(configuration.conversion_configuration()?)
        .map_err(|error| ContextError::with_error("Failed to set up the conversion client", &error))
}

fn log_failures(summary: &BatchSummary) {
    for failure in &summary.failed {
        log::error!("{:?} was not processed: {}", failure.file, failure.error);
    }
}
