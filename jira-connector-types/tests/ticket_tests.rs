use chrono::{TimeZone, Utc};
use jira_connector_types::ticket::validate_ticket;
use jira_connector_types::{
    CustomField, CustomFieldKind, CustomFieldValue, FieldValueError, ObjectChoice, Ticket,
    TicketError, TicketSchema,
};
use pretty_assertions::assert_eq;

fn schema() -> TicketSchema {
    let fields = vec![
        CustomField::pick_object(
            "project",
            "Project",
            true,
            vec![ObjectChoice::new("10000", "Platform")],
        ),
        CustomField::string("customfield_100", "Team", true).with_remote_type("string"),
        CustomField::pick_objects("components", "Components", false, Vec::new()),
        CustomField::timestamp("customfield_200", "Due", false),
        CustomField::pick_string(
            "customfield_300",
            "Severity",
            false,
            vec!["low".into(), "high".into()],
        ),
    ];
    TicketSchema {
        id: "PLAT:10001".into(),
        display_name: "Task".into(),
        custom_fields: fields.into_iter().map(|f| (f.id.clone(), f)).collect(),
        ..Default::default()
    }
}

fn valid_ticket() -> Ticket {
    let mut ticket = Ticket {
        display_name: "Grant access".into(),
        ..Default::default()
    };
    ticket.custom_fields.insert(
        "project".into(),
        CustomFieldValue::PickObject(ObjectChoice::new("10000", "Platform")),
    );
    ticket
        .custom_fields
        .insert("customfield_100".into(), CustomFieldValue::String("Identity".into()));
    ticket
}

// ── Validation ──────────────────────────────────────────────────

#[test]
fn valid_ticket_passes() {
    assert_eq!(validate_ticket(&schema(), &valid_ticket()), Ok(()));
}

#[test]
fn each_required_field_is_enforced() {
    let schema = schema();
    let required: Vec<String> = schema.required_fields().map(String::from).collect();
    assert_eq!(required, vec!["customfield_100".to_string(), "project".to_string()]);

    for field in required {
        let mut ticket = valid_ticket();
        ticket.custom_fields.remove(&field);
        let err = validate_ticket(&schema, &ticket).unwrap_err();
        assert_eq!(err, TicketError::MissingRequiredField { field: field.clone() });
        assert_eq!(err.field(), field);
    }
}

#[test]
fn empty_string_counts_as_missing() {
    let mut ticket = valid_ticket();
    ticket
        .custom_fields
        .insert("customfield_100".into(), CustomFieldValue::String(String::new()));
    let err = validate_ticket(&schema(), &ticket).unwrap_err();
    assert!(err.to_string().contains("customfield_100"));
}

#[test]
fn wrong_shape_is_reported_with_field() {
    let mut ticket = valid_ticket();
    ticket
        .custom_fields
        .insert("customfield_200".into(), CustomFieldValue::Bool(true));
    let err = validate_ticket(&schema(), &ticket).unwrap_err();
    assert_eq!(
        err,
        TicketError::WrongFieldShape {
            field: "customfield_200".into(),
            expected: "timestamp",
            found: "boolean",
        }
    );
}

#[test]
fn pick_outside_allowed_values_is_rejected() {
    let mut ticket = valid_ticket();
    ticket.custom_fields.insert(
        "customfield_300".into(),
        CustomFieldValue::PickString("critical".into()),
    );
    let err = validate_ticket(&schema(), &ticket).unwrap_err();
    assert_eq!(
        err,
        TicketError::InvalidChoice {
            field: "customfield_300".into(),
            value: "critical".into(),
        }
    );
}

#[test]
fn empty_choice_list_accepts_any_object() {
    let mut ticket = valid_ticket();
    ticket.custom_fields.insert(
        "components".into(),
        CustomFieldValue::PickObjects(vec![ObjectChoice::new("900", "Backend")]),
    );
    ticket.custom_fields.insert(
        "customfield_200".into(),
        CustomFieldValue::Timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
    );
    assert_eq!(validate_ticket(&schema(), &ticket), Ok(()));
}

// ── Typed getters ───────────────────────────────────────────────

#[test]
fn getters_report_missing_and_wrong_shape() {
    let ticket = valid_ticket();
    assert_eq!(ticket.field("components").unwrap_err(), FieldValueError::Missing);

    let team = ticket.field("customfield_100").unwrap();
    assert_eq!(team.as_str().unwrap(), "Identity");
    assert_eq!(
        team.as_pick_object().unwrap_err(),
        FieldValueError::WrongShape {
            expected: "object pick",
            found: "string",
        }
    );
}

// ── Serialization ───────────────────────────────────────────────

#[test]
fn custom_field_kind_is_flattened() {
    let field = CustomField::pick_objects(
        "components",
        "Components",
        false,
        vec![ObjectChoice::new("1", "A")],
    );
    let json = serde_json::to_value(&field).unwrap();
    assert_eq!(json["kind"], "pick_objects");
    assert_eq!(json["allowed"][0]["id"], "1");

    let back: CustomField = serde_json::from_value(json).unwrap();
    assert!(matches!(back.kind, CustomFieldKind::PickObjects { .. }));
}
