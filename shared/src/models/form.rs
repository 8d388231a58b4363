//! Form schema and receipt template

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldType {
    Text,
    Select,
    Phone,
    Number,
}

/// One input of the record form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FormFieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl FormField {
    fn text(name: &str, label: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            field_type: FormFieldType::Text,
            required,
            options: None,
        }
    }

    fn phone(name: &str, label: &str, required: bool) -> Self {
        Self {
            field_type: FormFieldType::Phone,
            ..Self::text(name, label, required)
        }
    }
}

/// Ordered list of record form fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormConfig {
    pub fields: Vec<FormField>,
}

impl FormConfig {
    pub fn required_fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            fields: vec![
                FormField::text("full_name", "ФИО", true),
                FormField::phone("phone", "Номер телефона", true),
                FormField::phone("phone_additional", "Доп номер телефона", false),
                FormField::text("car_brand", "Марка машины", true),
                FormField::text("parameters", "Параметры", true),
                FormField::text("size", "Размер", true),
                FormField {
                    name: "storage_location".to_string(),
                    label: "Место хранения".to_string(),
                    field_type: FormFieldType::Select,
                    required: true,
                    options: Some(vec![
                        "Бекетова 3а.к15".to_string(),
                        "Московское шоссе 22к1".to_string(),
                    ]),
                },
            ],
        }
    }
}

/// Receipt document template
///
/// Placeholders: any field name plus `{record_number}`, `{record_id}`
/// and `{created_at}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptTemplate {
    pub template: String,
}

impl Default for ReceiptTemplate {
    fn default() -> Self {
        Self {
            template: "Я {full_name}, {phone}, оставил на хранение {parameters}, {size}, \
                       в Шинном Бюро по адресу {storage_location}, номер акта {record_number} \
                       {created_at}. Подпись: _________________"
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_required_fields() {
        let config = FormConfig::default();
        let required: Vec<&str> = config.required_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(
            required,
            vec![
                "full_name",
                "phone",
                "car_brand",
                "parameters",
                "size",
                "storage_location"
            ]
        );
        assert!(!config.field("phone_additional").unwrap().required);
    }

    #[test]
    fn test_field_type_serializes_as_type() {
        let config = FormConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["fields"][6]["type"], "select");
        assert_eq!(json["fields"][0]["type"], "text");
        assert!(json["fields"][0].get("options").is_none());
    }
}
