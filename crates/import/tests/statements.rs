use std::io::Write;

use tally_core::{fields, FieldSelector, ImportSettings, Money, Rule, TimeBased, NO_SUB_TAG};
use tally_import::{process_statement, ImportError, ImportWarning, Provider};

const WECHAT_HEADER: &str =
    "交易时间,交易类型,交易对方,商品,收/支,金额(元),支付方式,当前状态,交易单号,商户单号,备注";

fn wechat_statement(body: &str) -> String {
    let settings = ImportSettings::default();
    let mut text = String::new();
    text.push_str("微信支付账单明细\n");
    for i in 2..settings.wechat.checkpoint_line {
        text.push_str(&format!("说明 {i},,,\n"));
    }
    text.push_str(&settings.wechat.marker);
    text.push('\n');
    text.push_str(WECHAT_HEADER);
    text.push('\n');
    text.push_str(body);
    text
}

fn alipay_statement(body: &str) -> String {
    let settings = ImportSettings::default();
    let mut text = String::new();
    for i in 1..settings.alipay.checkpoint_line {
        text.push_str(&format!("支付宝交易记录明细 {i}\n"));
    }
    text.push_str(&settings.alipay.marker);
    text.push_str("\n交易时间,交易分类,交易对方,对方账号,商品说明,收/支,金额,收/付款方式,交易状态,交易订单号,商家订单号,备注\n");
    text.push_str(body);
    text
}

fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file
}

fn food_rules() -> Vec<Rule> {
    let mut coffee = Rule::new(FieldSelector::field(fields::COUNTERPARTY), &["瑞幸"], "食", "咖啡");
    coffee.comment = "咖啡".to_string();
    let mut canteen = Rule::new(FieldSelector::Any, &["食堂"], "食", "");
    canteen.time_based = TimeBased::all_periods();
    vec![coffee, canteen]
}

#[test]
fn wechat_statement_is_imported_and_tagged() {
    let text = wechat_statement(concat!(
        "2024-03-01 07:45:00,商户消费,公司食堂,早饭,支出,¥7.50,零钱,支付成功,W001,M001,/\n",
        "2024-03-01 15:20:00,商户消费,瑞幸咖啡,生椰拿铁,支出,¥15.90,招商银行,已退款(¥5.00),W002,M002,/\n",
        "2024-03-01 16:00:00,商户消费,便利店,零食,支出,¥12.00,零钱,已全额退款,W003,M003,/\n",
        "2024-03-01 18:00:00,转账,朋友,/,收入,¥200.00,零钱,已存入零钱,W004,M004,/\n",
        "2024-03-01 21:00:00,商户消费,夜市,烤串,支出,¥30.00,零钱,支付成功,W005,M005,/\n",
    ));
    let file = write_temp(text.as_bytes());

    let outcome = process_statement(
        file.path(),
        Provider::Wechat,
        &food_rules(),
        &ImportSettings::default(),
    )
    .unwrap();

    let ids: Vec<&str> = outcome.bills.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["W001", "W002", "W005"]);

    let breakfast = &outcome.bills["W001"];
    assert_eq!(breakfast.book, "微信");
    assert_eq!(breakfast.goods, "早饭");
    assert_eq!(breakfast.category, "食");
    assert_eq!(breakfast.tag, "早餐");
    assert_eq!(breakfast.matched_rule, "ANY: 食堂");

    let coffee = &outcome.bills["W002"];
    assert_eq!(coffee.amount, Money::from_parts(1090, 2));
    assert_eq!(coffee.tag, "咖啡");
    assert_eq!(coffee.note, "咖啡");

    let untagged = &outcome.bills["W005"];
    assert_eq!(untagged.category, "");
    assert_eq!(untagged.book, "微信");
}

#[test]
fn alipay_gbk_statement_with_refunds() {
    let text = alipay_statement(concat!(
        "2024-03-02 12:10:00,餐饮美食,公司食堂,,午饭,支出,28.00,因公付-餐补,交易成功,2024030201,,\n",
        "2024-03-02 14:30:00,餐饮美食,瑞幸咖啡,,拿铁,支出,19.00,花呗,交易成功,2024030202,,\n",
        "2024-03-02 14:45:00,退款,瑞幸咖啡,,退款-拿铁,不计收支,19.00,花呗,退款成功,2024030202_1,,\n",
        "2024-03-02 15:00:00,日用百货,超市,,纸巾,支出,9.90,余额,交易成功,2024030203,,\n",
        "2024-03-02 16:00:00,退款,超市,,退款-纸巾,不计收支,1.00,余额,退款成功,2024039999_1,,\n",
        "2024-03-02 17:00:00,投资理财,蚂蚁财富,,余额宝-单次转入,不计收支,500.00,余额,交易成功,2024030204,,\n",
    ));
    let (gbk, _, had_errors) = encoding_rs::GBK.encode(&text);
    assert!(!had_errors);
    let file = write_temp(&gbk);

    let outcome = process_statement(
        file.path(),
        Provider::Alipay,
        &food_rules(),
        &ImportSettings::default(),
    )
    .unwrap();

    let ids: Vec<&str> = outcome.bills.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["2024030201", "2024030203"]);

    let lunch = &outcome.bills["2024030201"];
    assert_eq!(lunch.amount, Money::from_parts(8, 0));
    assert_eq!(lunch.tag, "午餐");
    assert_eq!(lunch.book, "支付宝");
    assert_eq!(lunch.field(fields::PAYMENT_METHOD), Some("因公付-餐补"));

    let groceries = &outcome.bills["2024030203"];
    assert_eq!(groceries.category, "");

    assert_eq!(
        outcome.warnings,
        vec![ImportWarning::OrphanRefund {
            refund_id: "2024039999_1".to_string(),
            original_id: "2024039999".to_string(),
        }]
    );
}

#[test]
fn over_refund_aborts_the_import() {
    let text = alipay_statement(concat!(
        "2024-03-02 14:30:00,餐饮美食,瑞幸咖啡,,拿铁,支出,19.00,花呗,交易成功,2024030202,,\n",
        "2024-03-02 14:45:00,退款,瑞幸咖啡,,退款-拿铁,不计收支,25.00,花呗,退款成功,2024030202_1,,\n",
    ));
    let file = write_temp(text.as_bytes());
    let result = process_statement(file.path(), Provider::Alipay, &[], &ImportSettings::default());
    assert!(matches!(result, Err(ImportError::Refund(id)) if id == "2024030202_1"));
}

#[test]
fn wechat_export_fed_to_alipay_parser_is_rejected() {
    let text = wechat_statement("2024-03-01 07:45:00,商户消费,公司食堂,早饭,支出,¥7.50,零钱,支付成功,W001,M001,/\n");
    let file = write_temp(text.as_bytes());
    let result = process_statement(file.path(), Provider::Alipay, &[], &ImportSettings::default());
    assert!(matches!(result, Err(ImportError::Format(_))));
}

#[test]
fn settings_override_changes_pipeline() {
    let settings = ImportSettings::from_toml(
        r#"
        [tagging]
        no_sub_tag = "-"
        "#,
    )
    .unwrap();
    let text = wechat_statement("2024-03-01 15:00:00,商户消费,公司食堂,下午茶,支出,¥7.50,零钱,支付成功,W001,M001,/\n");
    let file = write_temp(text.as_bytes());
    let outcome = process_statement(file.path(), Provider::Wechat, &food_rules(), &settings).unwrap();
    let bill = &outcome.bills["W001"];
    assert_eq!(bill.category, "食");
    assert_eq!(bill.tag, "-");
    assert_ne!(bill.tag, NO_SUB_TAG);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = process_statement(
        &dir.path().join("absent.csv"),
        Provider::Wechat,
        &[],
        &ImportSettings::default(),
    );
    assert!(matches!(result, Err(ImportError::Io(_))));
}
