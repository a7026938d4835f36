//! Compare the keys of two records

use anyhow::Result;
use datopy_core::modeling::compare_keys;

use super::first_record;

/// Run the diff command
pub async fn run(reference: &str, candidate: &str) -> Result<()> {
    let reference_record = first_record(reference).await?;
    let candidate_record = first_record(candidate).await?;

    match compare_keys(&reference_record, &candidate_record) {
        Some(diff) => {
            tracing::debug!(missing = diff.missing_keys().len(), "records differ");
            println!("{}", serde_json::to_string_pretty(&diff.to_value())?);
        }
        None => println!("identical"),
    }
    Ok(())
}
