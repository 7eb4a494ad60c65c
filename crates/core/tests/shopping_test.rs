//! End-to-end purchase prediction: CSV file in, evaluation out.
//!
//! The synthetic sessions differ only in `PageValues`: buyers sit at
//! 100 and above, everyone else below 40, so 1-NN separates them exactly.

use std::io::Write;

use approx::assert_relative_eq;

use classic_ai_core::shopping::{evaluate, load_data, train_test_split, KNearestNeighbors};
use classic_ai_core::AiError;

const HEADER: &str = "Administrative,Administrative_Duration,Informational,Informational_Duration,ProductRelated,ProductRelated_Duration,BounceRates,ExitRates,PageValues,SpecialDay,Month,OperatingSystems,Browser,Region,TrafficType,VisitorType,Weekend,Revenue";

fn write_sessions(name: &str, rows: usize) -> std::path::PathBuf {
    let mut text = String::from(HEADER);
    for i in 0..rows {
        let buyer = i % 2 == 0;
        let page_value = if buyer { 100 + i } else { i };
        text.push_str(&format!(
            "\n1,10.5,0,0,12,300.0,0.02,0.04,{},0,Nov,2,2,1,3,Returning_Visitor,{},{}",
            page_value,
            if i % 3 == 0 { "TRUE" } else { "FALSE" },
            if buyer { "TRUE" } else { "FALSE" },
        ));
    }
    text.push('\n');

    let path = std::env::temp_dir().join(format!("{}_{}.csv", name, std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
    path
}

#[test]
fn test_separable_sessions_classify_perfectly() {
    let path = write_sessions("test_shopping_separable", 40);
    let data = load_data(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(data.len(), 40);

    let split = train_test_split(&data, 0.4, 2024).unwrap();
    assert_eq!(split.test.len(), 16);

    let model = KNearestNeighbors::default()
        .fit(&split.train.evidence, &split.train.labels)
        .unwrap();
    let predictions = model.predict(&split.test.evidence);
    let eval = evaluate(&split.test.labels, &predictions).unwrap();

    assert_eq!(eval.correct, 16);
    assert_eq!(eval.incorrect, 0);
    assert_relative_eq!(eval.sensitivity, 1.0);
    assert_relative_eq!(eval.specificity, 1.0);
}

#[test]
fn test_missing_file_is_reported() {
    let err = load_data("/definitely/not/here.csv").unwrap_err();
    assert!(matches!(err, AiError::Csv(_) | AiError::Io(_)));
}
