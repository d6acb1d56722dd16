use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::FindOptions;
use mongodb::Database;

use crate::{
    error::{AlertInputError, AlertServiceError},
    models::{Alert, Condition, Frequency},
};

use super::alert_store::ALERTS;

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub symbol: String,
    pub company_name: Option<String>,
    pub condition: Condition,
    pub target_price: f64,
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Clone, Default)]
pub struct AlertChanges {
    pub target_price: Option<f64>,
    pub condition: Option<Condition>,
    pub frequency: Option<Frequency>,
    pub is_active: Option<bool>,
}

fn check_target(target_price: f64) -> Result<(), AlertInputError> {
    if !target_price.is_finite() || target_price <= 0.0 {
        return Err(AlertInputError::InvalidTargetPrice);
    }
    Ok(())
}

/// Builds the stored record for a freshly created alert.
pub fn validate_new_alert(
    user_id: ObjectId,
    input: NewAlert,
    now: i64,
) -> Result<Alert, AlertInputError> {
    let symbol = input.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AlertInputError::EmptySymbol);
    }
    check_target(input.target_price)?;

    let company_name = input
        .company_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(Alert {
        id: ObjectId::new(),
        user_id,
        symbol,
        company_name,
        condition: input.condition,
        target_price: input.target_price,
        frequency: input.frequency.unwrap_or_default(),
        is_active: true,
        is_triggered: false,
        last_triggered_at: None,
        created_at: now,
    })
}

/// `$set` document for a user edit; `None` when nothing changes.
///
/// Re-enabling an alert or making it one-shot re-arms it: `is_triggered`
/// is cleared so a fired `once` alert can never sit active but unfireable.
/// `last_triggered_at` is kept; it only ever moves forward.
pub fn changes_to_set(changes: &AlertChanges) -> Result<Option<Document>, AlertInputError> {
    let mut set = Document::new();

    if let Some(tp) = changes.target_price {
        check_target(tp)?;
        set.insert("target_price", tp);
    }
    if let Some(c) = changes.condition {
        set.insert("condition", c.as_str());
    }
    if let Some(f) = changes.frequency {
        set.insert("frequency", f.as_str());
    }
    if let Some(active) = changes.is_active {
        set.insert("is_active", active);
    }
    if changes.is_active == Some(true) || changes.frequency == Some(Frequency::Once) {
        set.insert("is_triggered", false);
    }

    Ok((!set.is_empty()).then_some(set))
}

pub async fn create_alert(
    db: &Database,
    user_id: ObjectId,
    input: NewAlert,
) -> Result<Alert, AlertServiceError> {
    let alert = validate_new_alert(user_id, input, Utc::now().timestamp())?;

    db.collection::<Alert>(ALERTS)
        .insert_one(&alert, None)
        .await?;

    Ok(alert)
}

/// Returns true if the alert existed for this user.
pub async fn update_alert(
    db: &Database,
    user_id: ObjectId,
    alert_id: ObjectId,
    changes: &AlertChanges,
) -> Result<bool, AlertServiceError> {
    let Some(set) = changes_to_set(changes)? else {
        return Ok(false);
    };

    let res = db
        .collection::<Alert>(ALERTS)
        .update_one(
            doc! { "_id": alert_id, "user_id": user_id },
            doc! { "$set": set },
            None,
        )
        .await?;

    Ok(res.matched_count > 0)
}

pub async fn delete_alert(
    db: &Database,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<bool, AlertServiceError> {
    let res = db
        .collection::<Alert>(ALERTS)
        .delete_one(doc! { "_id": alert_id, "user_id": user_id }, None)
        .await?;

    Ok(res.deleted_count > 0)
}

fn symbol_filter(user_id: ObjectId, symbol: &str) -> Document {
    doc! { "user_id": user_id, "symbol": symbol.trim().to_uppercase() }
}

/// All alerts a user has on one ticker, newest first.
pub async fn list_user_symbol_alerts(
    db: &Database,
    user_id: ObjectId,
    symbol: &str,
) -> Result<Vec<Alert>, AlertServiceError> {
    let find_opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
    let mut cursor = db
        .collection::<Alert>(ALERTS)
        .find(symbol_filter(user_id, symbol), find_opts)
        .await?;

    let mut items: Vec<Alert> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res?);
    }

    Ok(items)
}

pub async fn list_user_alerts(
    db: &Database,
    user_id: ObjectId,
    active_only: bool,
) -> Result<Vec<Alert>, AlertServiceError> {
    let mut filter = doc! { "user_id": user_id };
    if active_only {
        filter.insert("is_active", true);
    }

    let find_opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
    let mut cursor = db.collection::<Alert>(ALERTS).find(filter, find_opts).await?;

    let mut items: Vec<Alert> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res?);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(symbol: &str, target: f64) -> NewAlert {
        NewAlert {
            symbol: symbol.into(),
            company_name: Some("  ".into()),
            condition: Condition::Above,
            target_price: target,
            frequency: None,
        }
    }

    #[test]
    fn new_alert_defaults() {
        let a = validate_new_alert(ObjectId::new(), input(" aapl ", 150.0), 42).unwrap();
        assert_eq!(a.symbol, "AAPL");
        assert_eq!(a.frequency, Frequency::Once);
        assert!(a.is_active);
        assert!(!a.is_triggered);
        assert_eq!(a.last_triggered_at, None);
        assert_eq!(a.company_name, None);
        assert_eq!(a.created_at, 42);
    }

    #[test]
    fn rejects_bad_input() {
        let user = ObjectId::new();
        assert_eq!(
            validate_new_alert(user, input("", 1.0), 0).unwrap_err(),
            AlertInputError::EmptySymbol
        );
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert_eq!(
                validate_new_alert(user, input("MSFT", bad), 0).unwrap_err(),
                AlertInputError::InvalidTargetPrice
            );
        }
    }

    #[test]
    fn edit_patch() {
        assert_eq!(changes_to_set(&AlertChanges::default()).unwrap(), None);

        let set = changes_to_set(&AlertChanges {
            frequency: Some(Frequency::PerHour),
            is_active: Some(false),
            ..Default::default()
        })
        .unwrap()
        .unwrap();
        assert_eq!(set.get_str("frequency").unwrap(), "per_hour");
        assert!(!set.get_bool("is_active").unwrap());
        assert!(set.get("is_triggered").is_none());

        let bad = AlertChanges {
            target_price: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(changes_to_set(&bad).unwrap_err(), AlertInputError::InvalidTargetPrice);
    }

    #[test]
    fn rearming_edits_clear_triggered_flag() {
        let reactivate = changes_to_set(&AlertChanges {
            is_active: Some(true),
            ..Default::default()
        })
        .unwrap()
        .unwrap();
        assert!(reactivate.get_bool("is_active").unwrap());
        assert!(!reactivate.get_bool("is_triggered").unwrap());

        let to_once = changes_to_set(&AlertChanges {
            frequency: Some(Frequency::Once),
            ..Default::default()
        })
        .unwrap()
        .unwrap();
        assert_eq!(to_once.get_str("frequency").unwrap(), "once");
        assert!(!to_once.get_bool("is_triggered").unwrap());
        assert!(to_once.get("last_triggered_at").is_none());

        let retarget = changes_to_set(&AlertChanges {
            target_price: Some(99.5),
            ..Default::default()
        })
        .unwrap()
        .unwrap();
        assert!(retarget.get("is_triggered").is_none());
    }

    #[test]
    fn symbol_lookup_is_case_insensitive() {
        let user = ObjectId::new();
        let f = symbol_filter(user, " aapl ");
        assert_eq!(f.get_str("symbol").unwrap(), "AAPL");
        assert_eq!(f.get_object_id("user_id").unwrap(), user);
    }
}
