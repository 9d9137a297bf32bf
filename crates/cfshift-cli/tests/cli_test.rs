use assert_cmd::cargo::cargo_bin_cmd;

const TEMPLATE: &str = r#"
Parameters:
  BucketNameParam:
    Type: String
Resources:
  LogsBucket:
    Type: AWS::S3::Bucket
    Properties:
      BucketName: !Ref BucketNameParam
Outputs:
  BucketArn:
    Value: !GetAtt LogsBucket.Arn
"#;

#[test]
fn test_convert_writes_terraform() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.yaml");
    let output = dir.path().join("main.tf");
    std::fs::write(&template, TEMPLATE).unwrap();

    cargo_bin_cmd!("cfshift")
        .args([
            "convert",
            template.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("variable \"bucket_name_param\""));
    assert!(text.contains("resource \"aws_s3_bucket\" \"logs_bucket\""));
    assert!(text.contains("bucket_name = var.bucket_name_param"));
    assert!(text.contains("value = aws_s3_bucket.logs_bucket.arn"));
}

#[test]
fn test_validate_accepts_template() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.yaml");
    std::fs::write(&template, TEMPLATE).unwrap();

    cargo_bin_cmd!("cfshift")
        .args(["validate", template.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn test_convert_missing_template_fails() {
    cargo_bin_cmd!("cfshift")
        .args(["convert", "does-not-exist.yaml"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Failed to read"));
}
