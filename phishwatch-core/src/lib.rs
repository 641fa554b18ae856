pub mod pipeline;
pub mod prompt;
pub mod recovery;
pub mod request;
pub mod verdict;

pub use pipeline::{AnalysisError, analyze, analyze_request};
pub use request::{AnalysisRequest, RequestError, normalize};
pub use verdict::{RiskLabel, Verdict};

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
       _     _     _                 _       _
 _ __ | |__ (_)___| |____      ____ _| |_ ___| |__
| '_ \| '_ \| / __| '_ \ \ /\ / / _` | __/ __| '_ \
| |_) | | | | \__ \ | | \ V  V / (_| | || (__| | | |
| .__/|_| |_|_|___/_| |_|\_/\_/ \__,_|\__\___|_| |_|
|_|"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "phishing-risk relay".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
