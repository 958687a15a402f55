use anyhow::Context;
use clap::{crate_version, App, Arg};
use std::{fs, process};

fn main() -> anyhow::Result<()> {
    let args = App::new("minicc")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("FILE")
                .help("Input source file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .takes_value(true)
                .required(true)
                .value_name("FILE")
                .help("Output assembly file"),
        )
        .arg(
            Arg::new("optimize")
                .short('O')
                .help("Enable constant folding and dead branch elimination"),
        )
        .get_matches();

    let in_path = args.value_of("input").unwrap();
    let out_path = args.value_of("output").unwrap();
    let optimizations = args.is_present("optimize");

    let source = fs::read_to_string(in_path)
        .with_context(|| format!("Failed to read source file: {}", in_path))?;

    let assembly = match minicc::compile(&source, optimizations) {
        Ok(assembly) => assembly,

        Err(error) => {
            eprintln!("{}", error);
            process::exit(1);
        }
    };

    // El archivo de salida solo se escribe si la compilación
    // completa tuvo éxito
    fs::write(out_path, assembly)
        .with_context(|| format!("Failed to write output file: {}", out_path))?;

    Ok(())
}
