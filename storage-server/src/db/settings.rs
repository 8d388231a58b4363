//! Settings table (form schema, receipt template)

use redb::ReadableTable;
use serde::{Serialize, de::DeserializeOwned};
use shared::models::{FormConfig, ReceiptTemplate};

use super::{RecordStore, SETTINGS_TABLE, StorageResult};

const FORM_CONFIG_KEY: &str = "form_config";
const RECEIPT_TEMPLATE_KEY: &str = "receipt_template";

impl RecordStore {
    fn get_setting<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;

        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn put_setting<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS_TABLE)?;
            let bytes = serde_json::to_vec(value)?;
            table.insert(key, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Stored form schema, or the built-in default
    pub fn form_config(&self) -> StorageResult<FormConfig> {
        Ok(self.get_setting(FORM_CONFIG_KEY)?.unwrap_or_default())
    }

    pub fn set_form_config(&self, config: &FormConfig) -> StorageResult<()> {
        self.put_setting(FORM_CONFIG_KEY, config)
    }

    /// Stored receipt template, or the built-in default
    pub fn receipt_template(&self) -> StorageResult<ReceiptTemplate> {
        Ok(self.get_setting(RECEIPT_TEMPLATE_KEY)?.unwrap_or_default())
    }

    pub fn set_receipt_template(&self, template: &ReceiptTemplate) -> StorageResult<()> {
        self.put_setting(RECEIPT_TEMPLATE_KEY, template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{FormField, FormFieldType};

    #[test]
    fn test_defaults_when_unset() {
        let store = RecordStore::open_in_memory().unwrap();
        assert_eq!(store.form_config().unwrap(), FormConfig::default());
        assert_eq!(store.receipt_template().unwrap(), ReceiptTemplate::default());
    }

    #[test]
    fn test_form_config_persisted() {
        let store = RecordStore::open_in_memory().unwrap();
        let config = FormConfig {
            fields: vec![FormField {
                name: "full_name".into(),
                label: "ФИО".into(),
                field_type: FormFieldType::Text,
                required: true,
                options: None,
            }],
        };
        store.set_form_config(&config).unwrap();
        assert_eq!(store.form_config().unwrap(), config);
    }
}
