//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use clap::{CommandFactory, Parser};
use riskwise_core::{EngineConfig, Error, IncomeLevel, PaymentMode, RiskEngine, TrainingRequest};

use crate::cli::{Cli, Commands, TrainingArgs, TransactionArgs};
use crate::commands::train::drive_training;
use crate::commands::{self, format_percent};

fn small_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.training.sample_count = 400;
    config.training.epochs = 2;
    config.training.batch_size = 64;
    config.training.hidden_layers = vec![8];
    config.training.seed = Some(11);
    config
}

fn transaction_args() -> TransactionArgs {
    TransactionArgs {
        amount: 45_000.0,
        income: "middle".to_string(),
        hour: 23,
        location: "other".to_string(),
        merchants: vec!["crypto".to_string()],
        payment: "netbanking".to_string(),
    }
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_assess_with_merchant_list() {
    let cli = Cli::try_parse_from([
        "riskwise",
        "--seed",
        "3",
        "assess",
        "--amount",
        "1200",
        "--income",
        "low",
        "--hour",
        "14",
        "--location",
        "pune",
        "--merchant",
        "crypto,travel",
        "--merchant",
        "dining",
        "--payment",
        "upi",
        "--epochs",
        "5",
    ])
    .unwrap();

    assert_eq!(cli.seed, Some(3));
    match cli.command {
        Commands::Assess {
            transaction,
            training,
        } => {
            assert_eq!(transaction.merchants, vec!["crypto", "travel", "dining"]);
            assert_eq!(training.epochs, Some(5));
            assert_eq!(training.samples, None);
        }
        _ => panic!("expected assess command"),
    }
}

#[test]
fn test_parse_requires_merchant() {
    let result = Cli::try_parse_from([
        "riskwise", "encode", "--amount", "10", "--income", "low", "--hour", "1",
        "--location", "pune", "--payment", "upi",
    ]);
    assert!(result.is_err());
}

// ========== Shared Utility Tests ==========

#[test]
fn test_attributes_from_args() {
    let attrs = commands::attributes_from_args(&transaction_args()).unwrap();
    assert_eq!(attrs.income_level, IncomeLevel::Middle);
    assert_eq!(attrs.payment_mode, PaymentMode::NetBanking);
    assert_eq!(attrs.merchant_types, vec!["crypto"]);
}

#[test]
fn test_attributes_from_args_drops_repeated_merchants() {
    let mut args = transaction_args();
    args.merchants = vec![
        "Crypto".to_string(),
        "travel".to_string(),
        " crypto ".to_string(),
    ];
    let attrs = commands::attributes_from_args(&args).unwrap();
    assert_eq!(attrs.merchant_types, vec!["crypto", "travel"]);
}

#[test]
fn test_attributes_from_args_rejects_unknown_values() {
    let mut args = transaction_args();
    args.income = "rich".to_string();
    let err = commands::attributes_from_args(&args).unwrap_err();
    assert!(err.to_string().contains("Unknown income level"));

    let mut args = transaction_args();
    args.payment = "cheque".to_string();
    let err = commands::attributes_from_args(&args).unwrap_err();
    assert!(err.to_string().contains("Unknown payment mode"));

    let mut args = transaction_args();
    args.hour = 24;
    assert!(commands::attributes_from_args(&args).is_err());
}

#[test]
fn test_training_request_overrides() {
    let config = small_config();
    let request = commands::training_request(&config, &TrainingArgs::default());
    assert_eq!(request.sample_count, 400);
    assert_eq!(request.epochs, 2);

    let args = TrainingArgs {
        samples: Some(100),
        epochs: None,
        batch_size: Some(16),
    };
    let request = commands::training_request(&config, &args);
    assert_eq!(request.sample_count, 100);
    assert_eq!(request.epochs, 2);
    assert_eq!(request.batch_size, 16);
}

#[test]
fn test_load_config_seed_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[training]\nepochs = 7\nseed = 1\n").unwrap();

    let config = commands::load_config(Some(&path), None).unwrap();
    assert_eq!(config.training.epochs, 7);
    assert_eq!(config.training.seed, Some(1));

    let config = commands::load_config(Some(&path), Some(99)).unwrap();
    assert_eq!(config.training.seed, Some(99));
}

#[test]
fn test_load_config_missing_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let result = commands::load_config(Some(&dir.path().join("nope.toml")), None);
    assert!(result.is_err());
}

#[test]
fn test_format_percent() {
    assert_eq!(format_percent(Some(0.912)), "91.2%");
    assert_eq!(format_percent(None), "n/a");
}

// ========== Command Tests ==========

#[test]
fn test_cmd_encode() {
    let config = small_config();
    assert!(commands::cmd_encode(&config, &transaction_args(), false).is_ok());
    assert!(commands::cmd_encode(&config, &transaction_args(), true).is_ok());
}

#[test]
fn test_cmd_encode_invalid_amount() {
    let mut args = transaction_args();
    args.amount = -5.0;
    assert!(commands::cmd_encode(&small_config(), &args, false).is_err());
}

#[test]
fn test_cmd_generate_writes_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("samples.csv");

    commands::cmd_generate(&small_config(), 150, Some(&path), false).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert!(lines.next().unwrap().ends_with("composed_risk,label"));
    assert_eq!(lines.count(), 150);
}

#[test]
fn test_cmd_generate_zero_count() {
    assert!(commands::cmd_generate(&small_config(), 0, None, false).is_err());
}

#[test]
fn test_cmd_config() {
    let config = small_config();
    assert!(commands::cmd_config(&config, None, false).is_ok());
    assert!(commands::cmd_config(&config, None, true).is_ok());
}

#[tokio::test]
async fn test_cmd_train() {
    let result = commands::cmd_train(&small_config(), &TrainingArgs::default(), false).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_train_rejects_zero_epochs() {
    let args = TrainingArgs {
        epochs: Some(0),
        ..TrainingArgs::default()
    };
    assert!(commands::cmd_train(&small_config(), &args, false).await.is_err());
}

#[tokio::test]
async fn test_cmd_assess() {
    let result = commands::cmd_assess(
        &small_config(),
        &transaction_args(),
        &TrainingArgs::default(),
        true,
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_assess_rejects_bad_input_before_training() {
    let mut args = transaction_args();
    args.merchants = vec!["  ".to_string()];
    let result =
        commands::cmd_assess(&small_config(), &args, &TrainingArgs::default(), false).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_interrupt_aborts_training() {
    let engine = RiskEngine::new(small_config()).unwrap();
    let request = TrainingRequest {
        sample_count: 200_000,
        ..TrainingRequest::from_config(&small_config().training)
    };

    let interrupt = async { Ok::<(), std::io::Error>(()) };
    let err = drive_training(&engine, request, true, interrupt)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::TrainingCancelled)
    ));
    assert!(!engine.is_training());
    assert!(!engine.has_model());
}

#[tokio::test]
async fn test_unavailable_interrupt_does_not_abort() {
    let engine = RiskEngine::new(small_config()).unwrap();
    let request = TrainingRequest::from_config(&small_config().training);
    let unavailable = async { Err::<(), _>(std::io::Error::other("no signal handler")) };

    let summary = drive_training(&engine, request, true, unavailable).await.unwrap();
    assert_eq!(summary.samples, 400);
    assert!(engine.has_model());
}
