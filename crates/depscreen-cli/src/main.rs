use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::io::{self, Write};
use std::path::PathBuf;

use depscreen::config::{load_matrix_config, MatrixConfig};
use depscreen::dependency::matrix::{dependency_measures, DependencyMatrix, DependencyReport, Measure};
use depscreen::io::{read_dataset, DatasetReaderConfig};

/// Which tables to print.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Output {
    Statistic(Measure),
    SampleCount,
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("DEPSCREEN_LOG", "error,depscreen=info"))
        .init();

    let matches = Command::new("depscreen")
        .version(clap::crate_version!())
        .about("Pairwise dependency screening (correlation, mutual information, HSIC) between dataset columns")
        .arg_required_else_help(true)
        .arg(
            Arg::new("dataset")
                .help("Delimited text file with a header row; the first column is the index unless --index-column is given")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("against")
                .short('a')
                .long("against")
                .help("Second dataset. Columns of the first dataset form the rows, columns of this one the columns. Defaults to the first dataset.")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("JSON file with histogram, kernel and matrix settings; missing keys take defaults")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("delimiter")
                .short('d')
                .long("delimiter")
                .help("Field delimiter of the input files (a single ASCII character, or 'tab')")
                .default_value(","),
        )
        .arg(
            Arg::new("index_column")
                .short('i')
                .long("index-column")
                .help("Name of the index column")
                .value_parser(clap::builder::NonEmptyStringValueParser::new()),
        )
        .arg(
            Arg::new("measure")
                .short('m')
                .long("measure")
                .help("Table to print")
                .value_parser(["corr", "mi", "hsic", "nsamp", "all"])
                .default_value("all"),
        )
        .arg(
            Arg::new("sequential")
                .long("sequential")
                .help("Evaluate column pairs on the calling thread instead of the thread pool")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    run(&matches)
}

fn run(matches: &ArgMatches) -> Result<()> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            log::info!("Using config: {:?}", path);
            load_matrix_config(path)?
        }
        None => MatrixConfig::default(),
    };
    if matches.get_flag("sequential") {
        config.parallel = false;
    }

    let reader_config = DatasetReaderConfig {
        delimiter: parse_delimiter(
            matches
                .get_one::<String>("delimiter")
                .map(String::as_str)
                .unwrap_or(","),
        )?,
        index_column: matches.get_one::<String>("index_column").cloned(),
        ..DatasetReaderConfig::default()
    };

    let first_path: &PathBuf = matches
        .get_one("dataset")
        .ok_or_else(|| anyhow!("Missing dataset argument"))?;
    let first = read_dataset(first_path, &reader_config)?;
    let second = match matches.get_one::<PathBuf>("against") {
        Some(path) => read_dataset(path, &reader_config)?,
        None => first.clone(),
    };

    let report = dependency_measures(&first, &second, &config)
        .context("Dependency screening failed")?;

    let outputs = selected_outputs(
        matches
            .get_one::<String>("measure")
            .map(String::as_str)
            .unwrap_or("all"),
    );
    write_report(&report, &outputs)
}

fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(c as u8),
                _ => Err(anyhow!("Delimiter must be a single ASCII character, got '{}'", raw)),
            }
        }
    }
}

fn selected_outputs(name: &str) -> Vec<Output> {
    match name {
        "corr" => vec![Output::Statistic(Measure::Correlation)],
        "mi" => vec![Output::Statistic(Measure::MutualInformation)],
        "hsic" => vec![Output::Statistic(Measure::Hsic)],
        "nsamp" => vec![Output::SampleCount],
        _ => Measure::ALL
            .iter()
            .map(|&m| Output::Statistic(m))
            .chain(std::iter::once(Output::SampleCount))
            .collect(),
    }
}

fn write_report(report: &DependencyReport, outputs: &[Output]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for (i, output) in outputs.iter().enumerate() {
        if i > 0 {
            writeln!(stdout)?;
        }
        match output {
            Output::Statistic(measure) => {
                write_matrix(&mut stdout, measure.name(), report.matrix(*measure), |v| {
                    v.map(|x| x.to_string()).unwrap_or_default()
                })?
            }
            Output::SampleCount => {
                write_matrix(&mut stdout, "sample_count", &report.sample_count, |n| {
                    n.to_string()
                })?
            }
        }
    }
    Ok(())
}

/// One labelled CSV block: the header row starts with `label`, each data row
/// with its row name.
fn write_matrix<W: Write, T, F>(
    out: &mut W,
    label: &str,
    matrix: &DependencyMatrix<T>,
    format_cell: F,
) -> Result<()>
where
    F: Fn(&T) -> String,
{
    let mut writer = csv::Writer::from_writer(&mut *out);
    let header = std::iter::once(label.to_string()).chain(matrix.columns().iter().cloned());
    writer.write_record(header)?;
    for (row_name, row) in matrix.rows().iter().zip(matrix.values().outer_iter()) {
        let record = std::iter::once(row_name.clone()).chain(row.iter().map(&format_cell));
        writer.write_record(record)?;
    }
    writer.flush().context("Failed to write output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn test_selected_outputs() {
        assert_eq!(selected_outputs("nsamp"), vec![Output::SampleCount]);
        assert_eq!(selected_outputs("all").len(), 4);
    }

    #[test]
    fn test_write_matrix_leaves_unavailable_cells_empty() {
        let matrix = DependencyMatrix::filled(
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()],
            None,
        );
        let mut buffer = Vec::new();
        write_matrix(&mut buffer, "hsic", &matrix, |v: &Option<f64>| {
            v.map(|x| x.to_string()).unwrap_or_default()
        })
        .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "hsic,c\na,\nb,\n");
    }
}
