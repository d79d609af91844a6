use std::collections::BTreeMap;

use super::{FieldMetadata, FieldSchema, FieldType, Inclusion, RecordSchema};

fn string() -> Vec<FieldType> {
    vec![FieldType::String]
}

fn nullable_string() -> Vec<FieldType> {
    vec![FieldType::Null, FieldType::String]
}

fn automatic(name: &str, types: Vec<FieldType>, description: &str) -> (String, FieldSchema) {
    field(name, types, description, Inclusion::Automatic, None)
}

fn available(name: &str, types: Vec<FieldType>, description: &str) -> (String, FieldSchema) {
    field(name, types, description, Inclusion::Available, Some(true))
}

fn field(
    name: &str,
    types: Vec<FieldType>,
    description: &str,
    inclusion: Inclusion,
    selected_by_default: Option<bool>,
) -> (String, FieldSchema) {
    (
        name.to_owned(),
        FieldSchema {
            types,
            description: description.to_owned(),
            metadata: FieldMetadata {
                inclusion,
                selected: None,
                selected_by_default,
            },
        },
    )
}

/// Schema shared by the inbound and outbound recent-activity streams.
pub fn activity_schema() -> RecordSchema {
    let properties: BTreeMap<String, FieldSchema> = [
        automatic(
            "id",
            string(),
            "Manufactured unique ID for the activity.",
        ),
        automatic(
            "createdDate",
            string(),
            "The date the activity was recorded.",
        ),
        automatic(
            "contactId",
            string(),
            "The ID assigned to the contact associated with the activity.",
        ),
        automatic(
            "activityType",
            string(),
            "The type of activity the object represents. For outbound activities, \
             this can be `send` or `sms_send`.",
        ),
        automatic(
            "listId",
            nullable_string(),
            "The ID assigned to the list that the delivery associated with the \
             activity was sent to.",
        ),
        automatic(
            "segmentId",
            nullable_string(),
            "The ID assigned to the segment that the delivery associated with the \
             activity was sent to.",
        ),
        automatic(
            "keywordId",
            nullable_string(),
            "The ID assigned to the SMS keyword that the SMS delivery associated \
             with the activity was sent to.",
        ),
        automatic(
            "messageId",
            nullable_string(),
            "The ID assigned to the message associated with the activity.",
        ),
        available(
            "deliveryId",
            nullable_string(),
            "The ID assigned to the delivery associated with the activity.",
        ),
        available(
            "workflowId",
            nullable_string(),
            "The ID assigned to the workflow that sent the delivery associated \
             with the activity.",
        ),
        available(
            "emailAddress",
            nullable_string(),
            "The email address of the contact associated with the activity. The \
             emailAddress property is returned if a contactId is returned, and an \
             email address is stored for the associated contact.",
        ),
        available(
            "mobileNumber",
            nullable_string(),
            "The mobile number of the contact associated with the activity. The \
             mobileNumber property is returned if a contactId is returned, and a \
             mobile number is stored for the associated contact.",
        ),
        available(
            "contactStatus",
            nullable_string(),
            "The status of the contact associated with the activity. Status can \
             be `active`, `onboarding`, `transactional`, `bounce`, `unconfirmed`, \
             or `unsub`",
        ),
        available(
            "messageName",
            nullable_string(),
            "The name of the message associated with the activity. The \
             messageName property is returned if a messageId is returned.",
        ),
        available(
            "deliveryType",
            nullable_string(),
            "The type of delivery associated with the activity: `bulk`, `test`, \
             `split`, `trigger`, or `ftaf` (forward to a  friend).",
        ),
        available(
            "deliveryStart",
            nullable_string(),
            "The date/time the delivery associated with the activity was \
             scheduled. The deliveryStart property is returned if a deliveryId is \
             returned.",
        ),
        available(
            "workflowName",
            nullable_string(),
            "The name of the workflow associated with the activity. The \
             workflowName property is returned if a workflowId is returned.",
        ),
        available(
            "segmentName",
            nullable_string(),
            "The name of the segment associated with the activity. The \
             segmentName property is returned if a segmentId is returned.",
        ),
        available(
            "listName",
            nullable_string(),
            "The name of the list associated with the activity. The listName \
             property is returned if a listId is returned.",
        ),
        available(
            "listLabel",
            nullable_string(),
            "The label assigned to the list associated with the activity. The \
             label is the external (customer facing) name given to a list. The \
             listLabel property is returned if a listId is returned.",
        ),
        available(
            "automatorName",
            nullable_string(),
            "The name of the automator associated with the activity.",
        ),
        available(
            "smsKeywordName",
            nullable_string(),
            "The name of the SMS keyword associated with the activity. The \
             smsKeywordName property is returned if a keywordId is returned.",
        ),
        available(
            "bounceType",
            nullable_string(),
            "The type of bounce recorded. The following types can be returned: \
             Hard Bounces: bad_email, destination_unreachable, \
             rejected_message_content. Soft Bounces: temporary_contact_issue, \
             destination_temporarily_unavailable, deferred_message_content, \
             unclassified. The bounceType property is returned if the \
             activityType is bounce.",
        ),
        available(
            "bounceReason",
            nullable_string(),
            "The detailed reason why the bounce occurred. The bounceReason \
             property is returned if the activityType is bounce.",
        ),
        available(
            "skipReason",
            nullable_string(),
            "The detailed reason why the contact was skipped when attempting to \
             send to them. The skipReason property is returned if the \
             activityType is contactskip.",
        ),
        available(
            "linkName",
            nullable_string(),
            "The name of the link that was clicked. The linkName property is \
             returned if the activityType is click.",
        ),
        available(
            "linkUrl",
            nullable_string(),
            "The URL of the link that was clicked. The linkUrl property is \
             returned if the activityType is click.",
        ),
        available(
            "orderId",
            nullable_string(),
            "The ID assigned to the order. The orderId property is returned if \
             the activityType is conversion.",
        ),
        available(
            "unsubscribeMethod",
            nullable_string(),
            "The method used by the contact to unsubscribe. Valid values are: \
             subscriberadmin, bulk, listcleaning, fbl (Feedback Loop), complaint, \
             account, api, unclassified. The unsubscribeMethod property is \
             returned if the activityType is unsubscribe.",
        ),
        available(
            "ftafEmails",
            nullable_string(),
            "The emails that were used in the Forward To A Friend Delivery. The \
             ftafEmails property is returned if the activityType is \
             friendforward.",
        ),
        available(
            "socialNetwork",
            nullable_string(),
            "The social network the activity was performed on. The valid networks \
             are: facebook, twitter, linkedin, digg, myspace. The bounceType \
             property is returned if the activityType is social.",
        ),
        available(
            "socialActivity",
            nullable_string(),
            "The activity performed. The valid activities are: view, share. The \
             socialActivity property is returned if the activityType is social.",
        ),
        available(
            "webformId",
            nullable_string(),
            "The unique ID for a webform.",
        ),
        available(
            "webformAction",
            nullable_string(),
            "The activity performed on the webform. Valid values are: submitted, \
             view. The webformAction property is returned if the activityType is \
             webform.",
        ),
        available(
            "webformName",
            nullable_string(),
            "The name of the webform used. The webformName property is returned \
             if the activityType is webform.",
        ),
    ]
    .into_iter()
    .collect();

    RecordSchema {
        kind: FieldType::Object,
        properties,
        metadata: FieldMetadata {
            inclusion: Inclusion::Available,
            selected: None,
            selected_by_default: Some(false),
        },
        additional_properties: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::is_selected;

    #[test]
    fn identity_fields_are_automatic() {
        let schema = activity_schema();
        for name in ["id", "createdDate", "contactId", "activityType", "messageId"] {
            let f = &schema.properties[name];
            assert_eq!(f.metadata.inclusion, Inclusion::Automatic, "{name}");
        }
    }

    #[test]
    fn every_field_selected_by_default() {
        let schema = activity_schema();
        assert_eq!(schema.properties.len(), 35);
        assert!(schema.properties.values().all(is_selected));
    }

    #[test]
    fn serializes_as_json_schema() {
        let json = serde_json::to_value(activity_schema()).expect("serialize");
        assert_eq!(json["type"], "object");
        assert_eq!(json["additionalProperties"], false);
        assert_eq!(json["properties"]["listId"]["type"], serde_json::json!(["null", "string"]));
        assert_eq!(
            json["properties"]["deliveryId"]["metadata"]["selected-by-default"],
            true
        );
    }
}
