use std::env;
use std::path::Path;

/// Values baked into the firmware at compile time.
/// Environment variables take priority over `.env` file values.
const CONFIG_KEYS: [&str; 4] = ["WIFI_SSID", "WIFI_PASSWORD", "SERVER_URL", "API_KEY"];

/// Secrets are never echoed back in build warnings
const SECRET_KEYS: [&str; 2] = ["WIFI_PASSWORD", "API_KEY"];

fn main() {
    load_env_config();

    // Linker scripts only apply to the ESP32-C3 image; host builds run the tests.
    if env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("riscv32") {
        linker_be_nice();
        // make sure linkall.x is the last linker script (otherwise might cause problems with flip-link)
        println!("cargo:rustc-link-arg=-Tlinkall.x");
    }
}

/// Load environment configuration from .env file
fn load_env_config() {
    println!("cargo:rerun-if-changed=.env");
    for key in CONFIG_KEYS {
        println!("cargo:rerun-if-env-changed={}", key);
    }

    if Path::new(".env").exists() {
        match dotenvy::dotenv() {
            Ok(_) => println!("cargo:warning=Loaded .env file"),
            Err(e) => println!("cargo:warning=Failed to load .env file: {}", e),
        }
    }

    for key in CONFIG_KEYS {
        // Empty strings count as "not configured" just like a missing variable
        let value = env::var(key).unwrap_or_default().trim().to_string();

        println!("cargo:rustc-env={}={}", key, value);

        if value.is_empty() {
            println!("cargo:warning={} is empty - the board will show the network fault color", key);
        } else if SECRET_KEYS.contains(&key) {
            println!("cargo:warning={} configured (length: {})", key, value.len());
        } else {
            println!("cargo:warning={} configured: {}", key, value);
        }
    }
}

fn linker_be_nice() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        let kind = &args[1];
        let what = &args[2];

        match kind.as_str() {
            "undefined-symbol" => match what.as_str() {
                "_stack_start" => {
                    eprintln!();
                    eprintln!("💡 Is the linker script `linkall.x` missing?");
                    eprintln!();
                }
                "esp_wifi_preempt_enable"
                | "esp_wifi_preempt_yield_task"
                | "esp_wifi_preempt_task_create" => {
                    eprintln!();
                    eprintln!("💡 `esp-wifi` has no scheduler enabled. Make sure you have the `builtin-scheduler` feature enabled, or that you provide an external scheduler.");
                    eprintln!();
                }
                _ => (),
            },
            // we don't have anything helpful for "missing-lib" yet
            _ => {
                std::process::exit(1);
            }
        }

        std::process::exit(0);
    }

    if let Ok(exe) = std::env::current_exe() {
        println!(
            "cargo:rustc-link-arg=--error-handling-script={}",
            exe.display()
        );
    }
}
