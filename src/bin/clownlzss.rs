extern crate clownlzss;
extern crate getopts;

use getopts::Options;
use std::env;
use std::fs::File;
use std::io::{Read, Write};

use clownlzss::formats::{chameleon, comper, enigma, faxman, gba, kosinski, kosinski_plus, rage, rocket, saxman};

#[derive(Clone, Copy)]
enum Format {
    Chameleon,
    Comper,
    Enigma,
    Faxman,
    Gba,
    GbaVramSafe,
    Kosinski,
    KosinskiPlus,
    Rage,
    Rocket,
    Saxman,
}

fn do_compress(input: &[u8], format: Format, module_size: Option<usize>) -> clownlzss::error::Result<Vec<u8>> {
    match (format, module_size) {
        (Format::Chameleon, None) => chameleon::compress(input),
        (Format::Chameleon, Some(m)) => chameleon::moduled_compress(input, m),
        (Format::Comper, None) => comper::compress(input),
        (Format::Comper, Some(m)) => comper::moduled_compress(input, m),
        (Format::Enigma, None) => enigma::compress(input),
        (Format::Enigma, Some(m)) => enigma::moduled_compress(input, m),
        (Format::Faxman, None) => faxman::compress(input),
        (Format::Faxman, Some(m)) => faxman::moduled_compress(input, m),
        (Format::Gba, None) => gba::compress(input),
        (Format::Gba, Some(m)) => gba::moduled_compress(input, m),
        (Format::GbaVramSafe, None) => gba::compress_vram_safe(input),
        (Format::GbaVramSafe, Some(m)) => gba::moduled_compress_vram_safe(input, m),
        (Format::Kosinski, None) => kosinski::compress(input),
        (Format::Kosinski, Some(m)) => kosinski::moduled_compress(input, m),
        (Format::KosinskiPlus, None) => kosinski_plus::compress(input),
        (Format::KosinskiPlus, Some(m)) => kosinski_plus::moduled_compress(input, m),
        (Format::Rage, None) => rage::compress(input),
        (Format::Rage, Some(m)) => rage::moduled_compress(input, m),
        (Format::Rocket, None) => rocket::compress(input),
        (Format::Rocket, Some(m)) => rocket::moduled_compress(input, m),
        (Format::Saxman, None) => saxman::compress_with_header(input),
        (Format::Saxman, Some(m)) => saxman::moduled_compress(input, m),
    }
}

fn do_decompress(input: &[u8], format: Format, module_size: Option<usize>) -> clownlzss::error::Result<Vec<u8>> {
    match (format, module_size) {
        (Format::Chameleon, None) => chameleon::decompress(input),
        (Format::Chameleon, Some(m)) => chameleon::moduled_decompress(input, m),
        (Format::Comper, None) => comper::decompress(input),
        (Format::Comper, Some(m)) => comper::moduled_decompress(input, m),
        (Format::Enigma, None) => enigma::decompress(input),
        (Format::Enigma, Some(m)) => enigma::moduled_decompress(input, m),
        (Format::Faxman, None) => faxman::decompress(input),
        (Format::Faxman, Some(m)) => faxman::moduled_decompress(input, m),
        (Format::Gba, None) | (Format::GbaVramSafe, None) => gba::decompress(input),
        (Format::Gba, Some(m)) | (Format::GbaVramSafe, Some(m)) => gba::moduled_decompress(input, m),
        (Format::Kosinski, None) => kosinski::decompress(input),
        (Format::Kosinski, Some(m)) => kosinski::moduled_decompress(input, m),
        (Format::KosinskiPlus, None) => kosinski_plus::decompress(input),
        (Format::KosinskiPlus, Some(m)) => kosinski_plus::moduled_decompress(input, m),
        (Format::Rage, None) => rage::decompress(input),
        (Format::Rage, Some(m)) => rage::moduled_decompress(input, m),
        (Format::Rocket, None) => rocket::decompress(input),
        (Format::Rocket, Some(m)) => rocket::moduled_decompress(input, m),
        (Format::Saxman, None) => saxman::decompress_with_header(input),
        (Format::Saxman, Some(m)) => saxman::moduled_decompress(input, m),
    }
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!(
        "Usage: {} [-ch|-c|-e|-f|-g|-gv|-k|-kp|-ra|-r|-s|-sn] [-m[=SIZE]] [-d] -i FILE -o FILE",
        program
    );
    print!("{}", opts.usage(&brief));
}

pub fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "input", "set input file", "FILE");
    opts.optopt("o", "output", "set output file", "FILE");
    opts.optflag("d", "decompress", "decompress the input file (default: compress)");
    opts.optflagopt("m", "moduled", "use the moduled chunked variant", "SIZE");
    opts.optflag("ch", "chameleon", "Chameleon format");
    opts.optflag("c", "comper", "Comper format");
    opts.optflag("e", "enigma", "Enigma format");
    opts.optflag("f", "faxman", "Faxman format");
    opts.optflag("g", "gba", "GBA BIOS format");
    opts.optflag("gv", "gba-vram-safe", "GBA BIOS format, VRAM-safe variant");
    opts.optflag("k", "kosinski", "Kosinski format");
    opts.optflag("kp", "kosinski-plus", "Kosinski+ format");
    opts.optflag("ra", "rage", "Rage format");
    opts.optflag("r", "rocket", "Rocket format");
    opts.optflag("sn", "saxman-headerless", "Saxman format without a size header");
    opts.optflag("s", "saxman", "Saxman format with a 2-byte size header");
    opts.optflag("h", "help", "print this help");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(&program, &opts);
            std::process::exit(1);
        }
    };

    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return;
    }

    let format = if matches.opt_present("ch") {
        Some(Format::Chameleon)
    } else if matches.opt_present("c") {
        Some(Format::Comper)
    } else if matches.opt_present("e") {
        Some(Format::Enigma)
    } else if matches.opt_present("f") {
        Some(Format::Faxman)
    } else if matches.opt_present("gv") {
        Some(Format::GbaVramSafe)
    } else if matches.opt_present("g") {
        Some(Format::Gba)
    } else if matches.opt_present("kp") {
        Some(Format::KosinskiPlus)
    } else if matches.opt_present("k") {
        Some(Format::Kosinski)
    } else if matches.opt_present("ra") {
        Some(Format::Rage)
    } else if matches.opt_present("r") {
        Some(Format::Rocket)
    } else if matches.opt_present("sn") {
        Some(Format::Saxman)
    } else if matches.opt_present("s") {
        Some(Format::Saxman)
    } else {
        None
    };

    let format = match format {
        Some(f) => f,
        None => {
            eprintln!("Error: no format flag given");
            print_usage(&program, &opts);
            std::process::exit(1);
        }
    };

    let module_size = if matches.opt_present("m") {
        Some(matches.opt_str("m").and_then(|s| s.parse::<usize>().ok()).unwrap_or(0x1000))
    } else {
        None
    };

    let (input, output) = match (matches.opt_str("i"), matches.opt_str("o")) {
        (Some(i), Some(o)) => (i, o),
        _ => {
            print_usage(&program, &opts);
            std::process::exit(1);
        }
    };

    let mut data = Vec::new();
    if let Err(e) = File::open(&input).and_then(|mut f| f.read_to_end(&mut data)) {
        eprintln!("Error reading {}: {}", input, e);
        std::process::exit(1);
    }

    let result = if matches.opt_present("d") {
        do_decompress(&data, format, module_size)
    } else {
        do_compress(&data, format, module_size)
    };

    let output_data = match result {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            std::process::exit(1);
        }
    };

    let mut outf = match File::create(&output) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error creating {}: {}", output, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = outf.write_all(&output_data) {
        eprintln!("Error writing {}: {}", output, e);
        std::process::exit(1);
    }
}
