//! Operator CLI for inspecting resource resolution from a shell. It resolves
//! exactly what a linked process would see from the same environment.

use std::env;
use std::path::Path;
use std::process::ExitCode;

use serde_json::json;
use sst_resource::crypto::KeyFileCipher;
use sst_resource::global;
use sst_resource::sources::parse_fragment;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Commands:\n  get <path>\n  names\n  decrypt-key-file <path> <env_var_with_base64_key>");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return ExitCode::FAILURE;
    }

    let outcome = match args[1].as_str() {
        "get" if args.len() == 3 => get(&args[2]),
        "names" if args.len() == 2 => names(),
        "decrypt-key-file" if args.len() == 4 => decrypt_key_file(&args[2], &args[3]),
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        Ok(rendered) => {
            println!("{rendered}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn get(path: &str) -> Result<String, String> {
    let resource = global::get(path).map_err(|e| format!("{e}"))?;
    serde_json::to_string_pretty(&resource.to_json()).map_err(|e| format!("{e}"))
}

fn names() -> Result<String, String> {
    let resources = global::resources().map_err(|e| format!("{e}"))?;
    let listing: Vec<_> = resources
        .names()
        .map(|name| json!({ "name": name, "source": resources.source_of(name) }))
        .collect();
    serde_json::to_string_pretty(&listing).map_err(|e| format!("{e}"))
}

fn decrypt_key_file(path: &str, key_var: &str) -> Result<String, String> {
    let key = env::var(key_var).map_err(|e| format!("{key_var}: {e}"))?;
    let cipher = KeyFileCipher::from_base64(&key).map_err(|e| format!("key setup failed: {e}"))?;
    let plaintext = cipher
        .open_file(Path::new(path))
        .map_err(|e| format!("decryption failed: {e}"))?;
    let fragment = parse_fragment(path, &plaintext).map_err(|e| format!("{e}"))?;
    serde_json::to_string_pretty(&fragment).map_err(|e| format!("{e}"))
}
