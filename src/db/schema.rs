table! {
    document_categories (id) {
        id -> Int4,
        code -> Varchar,
        name -> Varchar,
        description -> Text,
        prefix -> Varchar,
        next_number -> Int4,
        active -> Bool,
        created_at -> Timestamp,
    }
}

table! {
    use diesel::sql_types::*;
    use crate::db::types::Comment_type;

    document_comments (id) {
        id -> Int4,
        document -> Uuid,
        actor -> Int4,
        kind -> Comment_type,
        text -> Text,
        created_at -> Timestamp,
    }
}

table! {
    use diesel::sql_types::*;
    use crate::db::types::{Audit_action, Document_status};

    document_history (id) {
        id -> Int8,
        document -> Uuid,
        actor -> Nullable<Int4>,
        action -> Audit_action,
        from_status -> Nullable<Document_status>,
        to_status -> Document_status,
        comment -> Nullable<Text>,
        origin -> Nullable<Varchar>,
        timestamp -> Timestamp,
    }
}

table! {
    document_templates (id) {
        id -> Int4,
        category -> Int4,
        name -> Varchar,
        description -> Text,
        fields -> Bytea,
        active -> Bool,
        version -> Varchar,
    }
}

table! {
    use diesel::sql_types::*;
    use crate::db::types::Document_status;

    documents (id) {
        id -> Uuid,
        number -> Varchar,
        category -> Int4,
        template -> Nullable<Int4>,
        title -> Varchar,
        revision -> Varchar,
        content -> Bytea,
        status -> Document_status,
        locked -> Bool,
        created_by -> Int4,
        reviewed_by -> Nullable<Int4>,
        approved_by -> Nullable<Int4>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        submitted_at -> Nullable<Timestamp>,
        reviewed_at -> Nullable<Timestamp>,
        approved_at -> Nullable<Timestamp>,
        generated_file -> Nullable<Varchar>,
        version -> Int4,
    }
}

joinable!(document_comments -> documents (document));
joinable!(document_history -> documents (document));
joinable!(document_templates -> document_categories (category));
joinable!(documents -> document_categories (category));

allow_tables_to_appear_in_same_query!(
    document_categories,
    document_comments,
    document_history,
    document_templates,
    documents,
);
