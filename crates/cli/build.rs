use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("gosi")
        .version("0.1.0")
        .about("Harvest paginated municipal announcement boards")
        .arg(clap::arg!(--site <CODE> "Site code (output subdirectory)").required(true))
        .arg(clap::arg!(--base <URL> "Base URL anchoring relative links").required(true))
        .arg(clap::arg!(--list <TEMPLATE> "List URL template containing {page}").required(true))
        .arg(
            clap::arg!(-o --output <DIR> "Output root directory")
                .default_value("output")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--year <YYYY> "Stop below this year").default_value("2025"))
        .arg(clap::arg!(--date <DATE> "Stop below this date (YYYY-MM-DD, overrides --year)"))
        .arg(clap::arg!(--start_page <NUM> "First list page to visit").default_value("1"))
        .arg(clap::arg!(--max_pages <NUM> "Page limit, 0 = unlimited").default_value("0"))
        .arg(clap::arg!(--error_budget <NUM> "Consecutive empty-page budget").default_value("5"))
        .arg(clap::arg!(--truncate <NUM> "Title truncation length for dedup keys").default_value("100"))
        .arg(clap::arg!(--renderer <URL> "Rendering service base URL").default_value("http://localhost:3000"))
        .arg(clap::arg!(--renderer_token <TOKEN> "Rendering service token"))
        .arg(clap::arg!(--failure_log <FILE> "Append failures as JSON lines to this file"))
        .arg(clap::arg!(--url_store <FILE> "Cross-run detail URL bookkeeping file"))
        .arg(clap::arg!(--row_selector <SEL> "List row selector"))
        .arg(clap::arg!(--title_selector <SEL> "Title selector within a row"))
        .arg(clap::arg!(--date_selector <SEL> "Date selector within a row"))
        .arg(clap::arg!(--body_selector <SEL> "Detail body selector"))
        .arg(clap::arg!(--attachment_selector <SEL> "Attachment link selector"))
        .arg(clap::arg!(--download_call <REGEX> "Native download-call pattern for structured acquisition"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "gosi", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "gosi", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "gosi", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "gosi", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
