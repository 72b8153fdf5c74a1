//! 密码哈希功能单元测试
//!
//! 测试 Argon2id 密码哈希和验证功能

use iso_stack::{auth::PasswordHasher, error::AppError};

#[test]
fn test_hash_is_argon2id_phc_string() {
    let hasher = PasswordHasher::new();
    let hash = hasher.hash("p1").unwrap();

    assert!(hash.starts_with("$argon2id$"));
}

#[test]
fn test_hashes_are_salted() {
    let hasher = PasswordHasher::new();
    let first = hasher.hash("same password").unwrap();
    let second = hasher.hash("same password").unwrap();

    assert_ne!(first, second);
    hasher.verify("same password", &first).unwrap();
    hasher.verify("same password", &second).unwrap();
}

#[test]
fn test_verify_wrong_password_is_unauthenticated() {
    let hasher = PasswordHasher::new();
    let hash = hasher.hash("correct horse").unwrap();

    let err = hasher.verify("battery staple", &hash).unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

#[test]
fn test_unicode_password() {
    let hasher = PasswordHasher::new();
    let hash = hasher.hash("contraseña🔒").unwrap();
    hasher.verify("contraseña🔒", &hash).unwrap();
    assert!(hasher.verify("contrasena🔒", &hash).is_err());
}

#[test]
fn test_password_policy() {
    assert!(PasswordHasher::validate_password_policy("p1", 1).is_ok());
    assert!(PasswordHasher::validate_password_policy("", 1).is_err());

    // 最小长度按字符计算
    assert!(PasswordHasher::validate_password_policy("ñññ", 3).is_ok());
    assert!(PasswordHasher::validate_password_policy("ññ", 3).is_err());

    let huge = "x".repeat(2000);
    let err = PasswordHasher::validate_password_policy(&huge, 1).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
