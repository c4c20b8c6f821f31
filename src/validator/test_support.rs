// 校验器单元测试共用的记录构造工具

use crate::domain::record::Batch;
use crate::loader::{load, InputSource};
use serde_json::{json, Value};

/// 生成一条全部规则均通过的记录（每个账户一笔交易）
pub fn sample_record(cust_id: &str, account_ids: &[&str]) -> Value {
    let accounts: Vec<Value> = account_ids
        .iter()
        .map(|account_id| {
            json!({
                "account_id": account_id,
                "cust_id": cust_id,
                "account_type": "Checking",
                "account_status": "Active",
                "open_date": "2016-03-01",
                "current_balance": 1200.5,
                "currency": "USD",
                "interest_rate": 0.5,
                "overdraft_limit": 500
            })
        })
        .collect();

    let transactions: Vec<Value> = account_ids
        .iter()
        .map(|account_id| {
            json!({
                "transaction_id": format!("T-{}", account_id),
                "account_id": account_id,
                "transaction_date": "2017-01-10",
                "transaction_type": "Credit",
                "amount": 250.0,
                "transaction_category": "Deposit"
            })
        })
        .collect();

    json!({
        "customer": {
            "cust_id": cust_id,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "date_of_birth": "1985-04-12",
            "email": format!("{}@example.com", cust_id.to_lowercase()),
            "phone": "555-0100",
            "customer_since": "2015-01-01",
            "customer_segment": "Retail",
            "credit_score": 720
        },
        "accounts": accounts,
        "transactions": transactions
    })
}

pub fn batch_from(records: Vec<Value>) -> Batch {
    let text = Value::Array(records).to_string();
    load(InputSource::Bytes(text.as_bytes())).unwrap()
}
