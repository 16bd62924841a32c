use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};

use mzconvert::io::{
    convert_to_path, ConversionConfig, ConversionError, DocumentFormat, DocumentMetadata,
    MGFScanSource,
};
use mzconvert::meta::{InstrumentInfo, Manufacturer, SourceFile};
use mzconvert::scan::{Ionization, MassAnalyzer};

struct Arguments {
    input: PathBuf,
    config: ConversionConfig,
    model: String,
}

fn usage() -> String {
    "usage: mzconvert [--mzML|--mzXML] [-c] [-z] [-g] [--model NAME] <input.mgf>".to_string()
}

fn parse_args() -> Result<Arguments, String> {
    let mut config = ConversionConfig::new(DocumentFormat::MzXML);
    let mut input = None;
    let mut model = "LTQ Orbitrap".to_string();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mzML" => config.format = DocumentFormat::MzML,
            "--mzXML" => config.format = DocumentFormat::MzXML,
            "-c" | "--centroid" => config.centroid = true,
            "-z" | "--compress" => config.compress_peaks = true,
            "-g" | "--gzip" => config.gzip = true,
            "--model" => {
                model = args.next().ok_or_else(usage)?;
            }
            "-h" | "--help" => return Err(usage()),
            _ if input.is_none() => input = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument {arg}\n{}", usage())),
        }
    }
    let input = input.ok_or_else(usage)?;
    Ok(Arguments {
        input,
        config,
        model,
    })
}

fn run(args: Arguments) -> Result<(), ConversionError> {
    let instrument = InstrumentInfo::new(
        Manufacturer::Thermo,
        args.model,
        Ionization::Electrospray,
        vec![MassAnalyzer::FourierTransform],
    );
    let mut source = MGFScanSource::open_path(&args.input)?.with_instrument_info(instrument.clone());
    let metadata = DocumentMetadata::new(instrument)
        .with_source_file(SourceFile::from_path(&args.input, None)?)
        .with_run(source.run_info());

    let output = args.config.output_path_for(&args.input);
    let stats = convert_to_path(&mut source, &output, metadata, &args.config)?;
    info!(
        "{} scans written ({} centroided, {} empty) to {}",
        stats.scans_written,
        stats.centroided,
        stats.empty_scans,
        output.display()
    );
    if let Some(digest) = stats.digest {
        println!("{}\t{digest}", output.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(2);
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Conversion failed: {e}");
            ExitCode::FAILURE
        }
    }
}
