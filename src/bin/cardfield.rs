//! Card field validation CLI
//!
//! Usage:
//!   cardfield detect <PAN>
//!   cardfield format <PAN>
//!   cardfield sanitise-expiry <TEXT>
//!   cardfield validate-pan <PAN> [--accept BRAND]...
//!   cardfield validate-expiry <MM/YY>
//!   cardfield validate-cvc <CVC> [--brand NAME]
//!   cardfield simulate <FIELD> <KEYS> [--no-formatting]
//!
//! Global options: --config <FILE> (JSON card configuration), --output text|json

use cardfield::config::CardConfiguration;
use cardfield::detect::detect_brand;
use cardfield::expiry::{ExpiryDateSanitiser, ExpiryDateValidator};
use cardfield::format::PanFormatter;
use cardfield::resolve::{FieldId, RuleResolver};
use cardfield::validate::{CvcValidator, PanValidator};
use cardfield::{BrandCatalog, CardBrand, CardValidationConfig, CardValidationListener};
use cardfield::{FieldController, FieldText};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::cell::RefCell;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cardfield")]
#[command(author, version, about = "Card field validation and formatting", long_about = None)]
struct Cli {
    /// Card configuration document (JSON). The built-in brand table is used if omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the card brand from a (partial) PAN
    Detect {
        /// PAN or PAN prefix
        pan: String,
    },

    /// Group a PAN the way the card field displays it
    Format {
        /// PAN, with or without spaces
        pan: String,
    },

    /// Apply the expiry date auto-separator
    SanitiseExpiry {
        /// Expiry text as typed
        text: String,
    },

    /// Validate a PAN (length, pattern, Luhn, accepted brands)
    ValidatePan {
        /// PAN to validate
        pan: String,

        /// Accepted brand names (any brand if omitted)
        #[arg(short, long)]
        accept: Vec<String>,
    },

    /// Validate an expiry date in MM/YY form
    ValidateExpiry {
        /// Expiry date
        date: String,
    },

    /// Validate a CVC
    ValidateCvc {
        /// CVC to validate
        cvc: String,

        /// Brand whose CVC rule applies
        #[arg(short, long)]
        brand: Option<String>,
    },

    /// Type text into a field one key at a time and print every callback
    Simulate {
        /// Field to type into
        #[arg(value_enum)]
        field: FieldArg,

        /// Keys to type; '<' deletes the character before the caret
        keys: String,

        /// Disable PAN grouping
        #[arg(long)]
        no_formatting: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum FieldArg {
    Pan,
    Expiry,
    Cvc,
}

impl From<FieldArg> for FieldId {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::Pan => FieldId::Pan,
            FieldArg::Expiry => FieldId::ExpiryDate,
            FieldArg::Cvc => FieldId::Cvc,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match load_configuration(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    let ok = match cli.command {
        Commands::Detect { pan } => cmd_detect(&config, &pan, cli.output),
        Commands::Format { pan } => cmd_format(&config, &pan, cli.output),
        Commands::SanitiseExpiry { text } => cmd_sanitise_expiry(&text, cli.output),
        Commands::ValidatePan { pan, accept } => {
            cmd_validate_pan(&config, &pan, accept, cli.output)
        }
        Commands::ValidateExpiry { date } => cmd_validate_expiry(&date, cli.output),
        Commands::ValidateCvc { cvc, brand } => {
            cmd_validate_cvc(&config, &cvc, brand.as_deref(), cli.output)
        }
        Commands::Simulate {
            field,
            keys,
            no_formatting,
        } => cmd_simulate(config, field.into(), &keys, !no_formatting, cli.output),
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn load_configuration(path: Option<&PathBuf>) -> cardfield::Result<CardConfiguration> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| cardfield::Error::Document(format!("{}: {}", path.display(), e)))?;
            CardConfiguration::from_reader(BufReader::new(file))
        }
        None => Ok(CardConfiguration::default()),
    }
}

fn brand_json(brand: &CardBrand) -> serde_json::Value {
    json!({
        "name": brand.name(),
        "pan_lengths": brand.pan_lengths(),
        "cvc_length": brand.cvc_length(),
        "pan_grouping": brand.pan_grouping(),
    })
}

fn cmd_detect(config: &CardConfiguration, pan: &str, output: OutputFormat) -> bool {
    let brand = detect_brand(config, pan);
    match output {
        OutputFormat::Text => match &brand {
            Some(b) => {
                println!("Detected Brand: {}", b.name());
                println!("Valid Lengths: {:?}", b.pan_lengths());
                println!("CVC Length: {}", b.cvc_length());
            }
            None => println!("Detected Brand: Unknown"),
        },
        OutputFormat::Json => {
            let value = json!({ "brand": brand.as_deref().map(brand_json) });
            println!("{}", value);
        }
    }
    brand.is_some()
}

fn cmd_format(config: &CardConfiguration, pan: &str, output: OutputFormat) -> bool {
    let brand = detect_brand(config, pan);
    let formatted = PanFormatter::new(true).format(pan, brand.as_deref());
    match output {
        OutputFormat::Text => println!("{}", formatted),
        OutputFormat::Json => println!(
            "{}",
            json!({ "formatted": formatted, "brand": brand.as_deref().map(CardBrand::name) })
        ),
    }
    true
}

fn cmd_sanitise_expiry(text: &str, output: OutputFormat) -> bool {
    let sanitised = ExpiryDateSanitiser::sanitise(text);
    match output {
        OutputFormat::Text => println!("{}", sanitised),
        OutputFormat::Json => println!("{}", json!({ "sanitised": sanitised })),
    }
    true
}

fn cmd_validate_pan(
    config: &CardConfiguration,
    pan: &str,
    accept: Vec<String>,
    output: OutputFormat,
) -> bool {
    let brand = detect_brand(config, pan);
    let rule = RuleResolver::new(config).resolve(FieldId::Pan, brand.as_deref());
    let check = PanValidator::new(accept).check(pan, rule, brand.as_deref());

    match output {
        OutputFormat::Text => {
            println!("Valid: {}", if check.is_valid() { "yes" } else { "no" });
            println!(
                "Brand: {}",
                brand.as_deref().map(CardBrand::name).unwrap_or("Unknown")
            );
            if !check.is_valid() {
                println!("Error: {}", check);
            }
        }
        OutputFormat::Json => println!(
            "{}",
            json!({
                "valid": check.is_valid(),
                "brand": brand.as_deref().map(CardBrand::name),
                "result": check.to_string(),
            })
        ),
    }
    check.is_valid()
}

fn cmd_validate_expiry(date: &str, output: OutputFormat) -> bool {
    let valid = ExpiryDateValidator::default().validate(date);
    print_validity(valid, output);
    valid
}

fn cmd_validate_cvc(
    config: &CardConfiguration,
    cvc: &str,
    brand: Option<&str>,
    output: OutputFormat,
) -> bool {
    let brand = match brand {
        Some(name) => match config.brand(name) {
            Some(brand) => Some(brand.clone()),
            None => {
                eprintln!("Error: unknown brand '{}'", name);
                return false;
            }
        },
        None => None,
    };
    let rule = RuleResolver::new(config).resolve(FieldId::Cvc, brand.as_deref());
    let valid = CvcValidator::new(rule.clone()).validate(cvc);
    print_validity(valid, output);
    valid
}

fn print_validity(valid: bool, output: OutputFormat) {
    match output {
        OutputFormat::Text => println!("Valid: {}", if valid { "yes" } else { "no" }),
        OutputFormat::Json => println!("{}", json!({ "valid": valid })),
    }
}

/// Prints every callback as it arrives.
#[derive(Default)]
struct EventLog {
    events: RefCell<Vec<String>>,
}

impl EventLog {
    fn push(&self, event: String) {
        self.events.borrow_mut().push(event);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl CardValidationListener for EventLog {
    fn on_pan_validated(&self, is_valid: bool) {
        self.push(format!("pan {}", is_valid));
    }

    fn on_expiry_date_validated(&self, is_valid: bool) {
        self.push(format!("expiry {}", is_valid));
    }

    fn on_cvc_validated(&self, is_valid: bool) {
        self.push(format!("cvc {}", is_valid));
    }

    fn on_brand_changed(&self, brand: Option<&CardBrand>) {
        self.push(format!("brand {}", brand.map(CardBrand::name).unwrap_or("none")));
    }

    fn on_all_valid(&self) {
        self.push("all valid".to_string());
    }
}

fn cmd_simulate(
    config: CardConfiguration,
    field: FieldId,
    keys: &str,
    formatting: bool,
    output: OutputFormat,
) -> bool {
    let log = Rc::new(EventLog::default());
    let mut builder = CardValidationConfig::builder().listener(log.clone());
    if formatting {
        builder = builder.enable_pan_formatting();
    }
    let form_config = match builder.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return false;
        }
    };
    let catalog = BrandCatalog::with_configuration(config);
    let form = FieldController::new(form_config, &catalog);

    let mut current = FieldText::default();
    let mut steps = Vec::new();
    for key in keys.chars() {
        let (text, caret) = press(&current, key);
        current = match form.on_text_changed(field, &text, caret) {
            Ok(next) => next,
            Err(e) => {
                eprintln!("Error: {}", e);
                return false;
            }
        };
        let events = log.take();
        match output {
            OutputFormat::Text => {
                let mut line = format!("{:?} -> {:?} caret {}", key, current.text(), current.caret());
                if !events.is_empty() {
                    line.push_str(&format!("  [{}]", events.join(", ")));
                }
                println!("{}", line);
            }
            OutputFormat::Json => steps.push(json!({
                "key": key.to_string(),
                "text": current.text(),
                "caret": current.caret(),
                "events": events,
            })),
        }
    }

    let all_valid = form.all_valid();
    if let OutputFormat::Json = output {
        println!("{}", json!({ "steps": steps, "all_valid": all_valid }));
    }
    true
}

/// Applies one key press at the caret. `<` is backspace.
///
/// Carets are in characters, as the controller reports them.
fn press(current: &FieldText, key: char) -> (String, usize) {
    let mut chars: Vec<char> = current.text().chars().collect();
    let caret = current.caret().min(chars.len());
    if key == '<' {
        if caret == 0 {
            return (chars.into_iter().collect(), 0);
        }
        chars.remove(caret - 1);
        (chars.into_iter().collect(), caret - 1)
    } else {
        chars.insert(caret, key);
        (chars.into_iter().collect(), caret + 1)
    }
}
