//! Runs a fan-in pipeline of integer sources from the command line.
//!
//! ```text
//! conduit --sources 4 --count 1000 --square --deadline-ms 50 --verbose
//! ```

use conduit::{collect, Config};

fn main() {
    if let Err(error) = run(std::env::args().skip(1)) {
        eprintln!("conduit: {}", error);
        std::process::exit(1);
    }
}

fn run<I: Iterator<Item=String>>(args: I) -> Result<(), String> {
    let mut opts = getopts::Options::new();
    opts.optopt("s", "start", "first value of the first source", "N");
    opts.optopt("c", "count", "values produced by each source", "N");
    opts.optopt("n", "sources", "number of sources to merge", "N");
    opts.optflag("q", "square", "square every value before merging");
    opts.optflag("h", "help", "print this help");
    Config::install_options(&mut opts);

    let matches = opts.parse(args).map_err(|e| e.to_string())?;
    if matches.opt_present("help") {
        print!("{}", opts.usage("Usage: conduit [options]"));
        return Ok(());
    }

    let start: i64 = matches.opt_get_default("start", 0).map_err(|e| format!("invalid --start: {}", e))?;
    let count: i64 = matches.opt_get_default("count", 10).map_err(|e| format!("invalid --count: {}", e))?;
    let sources: i64 = matches.opt_get_default("sources", 1).map_err(|e| format!("invalid --sources: {}", e))?;
    let square = matches.opt_present("square");
    let config = Config::from_matches(&matches)?;

    let expected = count.max(0).saturating_mul(sources.max(0));
    let values = conduit::execute(config, move |pipeline| {
        let inputs = (0 .. sources).map(|index| {
            // Sources cover adjacent, non-overlapping ranges.
            let first = start.saturating_add(index.saturating_mul(count.max(0)));
            let source = pipeline.generate(first, count);
            if square { pipeline.transform(source, |x| x.wrapping_mul(x)) } else { source }
        }).collect::<Vec<_>>();
        let mut merged = pipeline.merge(inputs);
        collect(&mut merged)
    })?;

    let sum = values.iter().fold(0i64, |sum, value| sum.wrapping_add(*value));
    println!("values:\t{}", values.len());
    println!("sum:\t{}", sum);
    if (values.len() as i64) < expected {
        println!("truncated:\t{} of {} values", values.len(), expected);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::run;

    fn args(text: &str) -> impl Iterator<Item=String> + '_ {
        text.split_whitespace().map(|s| s.to_string())
    }

    #[test]
    fn runs_a_small_pipeline() {
        assert!(run(args("--sources 3 --count 5 --square")).is_ok());
        assert!(run(args("--help")).is_ok());
    }

    #[test]
    fn rejects_malformed_counts() {
        let error = run(args("--count many")).unwrap_err();
        assert!(error.contains("--count"));
    }
}
