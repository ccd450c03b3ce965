//! MongoDB collection adapter
//!
//! Implements [`DocumentCollection`] over the blocking MongoDB driver.
//! Filters and pipelines arrive as extended JSON and are converted to BSON on
//! the way in; documents are converted back to relaxed extended JSON.

use std::sync::Mutex;

use mongodb::bson::{Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::UpdateModifications;
use mongodb::sync::{Client, ClientSession, Collection};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::document::{CollectionError, CollectionResult, DocumentCollection, Update};
use crate::errors::{RegistryError, RegistryResult};

const DUPLICATE_KEY: i32 = 11000;

// ==================
// Conversion
// ==================

fn to_bson_document(value: &Value) -> CollectionResult<Document> {
    match Bson::try_from(value.clone()) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(_) => Err(CollectionError::InvalidOperation("expected a JSON object".to_string())),
        Err(e) => Err(CollectionError::InvalidOperation(format!("invalid extended JSON: {}", e))),
    }
}

fn to_bson_documents(values: &[Value]) -> CollectionResult<Vec<Document>> {
    values.iter().map(to_bson_document).collect()
}

fn to_json(document: Document) -> Value {
    Bson::Document(document).into_relaxed_extjson()
}

fn modifications(update: &Update) -> CollectionResult<UpdateModifications> {
    Ok(match update {
        Update::Operators(operators) => UpdateModifications::Document(to_bson_document(operators)?),
        Update::Pipeline(stages) => UpdateModifications::Pipeline(to_bson_documents(stages)?),
    })
}

fn write_error_code(err: &MongoError) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
        ErrorKind::Command(command) => Some(command.code),
        _ => None,
    }
}

fn collection_error(err: MongoError, id: Option<&str>) -> CollectionError {
    match (write_error_code(&err), id) {
        (Some(DUPLICATE_KEY), Some(id)) => CollectionError::DuplicateKey(id.to_string()),
        _ => CollectionError::Unavailable(err.to_string()),
    }
}

fn unavailable(err: MongoError) -> CollectionError {
    collection_error(err, None)
}

fn document_id(document: &Value) -> Option<&str> {
    document.get("_id").and_then(Value::as_str)
}

// ==================
// Collection
// ==================

/// One MongoDB collection holding shell descriptor documents
#[derive(Clone)]
pub struct MongoCollection {
    client: Client,
    collection: Collection<Document>,
}

impl MongoCollection {
    /// Connects to `uri` and opens `database.collection`. The driver connects
    /// lazily; connection failures surface on the first operation.
    pub fn connect(uri: &str, database: &str, collection: &str) -> RegistryResult<Self> {
        let client = Client::with_uri_str(uri)
            .map_err(|e| RegistryError::StorageUnavailable(format!("invalid MongoDB uri: {}", e)))?;
        let collection = client.database(database).collection::<Document>(collection);
        info!(database, collection = collection.name(), "MONGODB_COLLECTION_OPENED");
        Ok(Self { client, collection })
    }
}

impl DocumentCollection for MongoCollection {
    fn insert_one(&self, document: Value) -> CollectionResult<()> {
        let bson = to_bson_document(&document)?;
        self.collection
            .insert_one(bson, None)
            .map(|_| ())
            .map_err(|e| collection_error(e, document_id(&document)))
    }

    fn find_one(&self, filter: &Value) -> CollectionResult<Option<Value>> {
        let found = self
            .collection
            .find_one(to_bson_document(filter)?, None)
            .map_err(unavailable)?;
        Ok(found.map(to_json))
    }

    fn find_one_and_replace(
        &self,
        filter: &Value,
        replacement: Value,
    ) -> CollectionResult<Option<Value>> {
        let previous = self
            .collection
            .find_one_and_replace(to_bson_document(filter)?, to_bson_document(&replacement)?, None)
            .map_err(|e| collection_error(e, document_id(&replacement)))?;
        Ok(previous.map(to_json))
    }

    fn find_one_and_update(&self, filter: &Value, update: &Update) -> CollectionResult<Option<Value>> {
        let previous = self
            .collection
            .find_one_and_update(to_bson_document(filter)?, modifications(update)?, None)
            .map_err(unavailable)?;
        Ok(previous.map(to_json))
    }

    fn delete_one(&self, filter: &Value) -> CollectionResult<u64> {
        self.collection
            .delete_one(to_bson_document(filter)?, None)
            .map(|result| result.deleted_count)
            .map_err(unavailable)
    }

    fn delete_many(&self, filter: &Value) -> CollectionResult<u64> {
        self.collection
            .delete_many(to_bson_document(filter)?, None)
            .map(|result| result.deleted_count)
            .map_err(unavailable)
    }

    fn count(&self, filter: &Value) -> CollectionResult<u64> {
        self.collection
            .count_documents(to_bson_document(filter)?, None)
            .map_err(unavailable)
    }

    fn aggregate(&self, pipeline: &[Value]) -> CollectionResult<Vec<Value>> {
        let cursor = self
            .collection
            .aggregate(to_bson_documents(pipeline)?, None)
            .map_err(unavailable)?;
        cursor
            .map(|document| document.map(to_json).map_err(unavailable))
            .collect()
    }

    fn transaction(
        &self,
        body: &mut dyn FnMut(&dyn DocumentCollection) -> RegistryResult<()>,
    ) -> RegistryResult<()> {
        let mut session = self.client.start_session(None).map_err(unavailable)?;
        session.start_transaction(None).map_err(unavailable)?;

        let scope = SessionScope {
            collection: &self.collection,
            session: Mutex::new(session),
        };
        let outcome = body(&scope);
        let mut session = scope
            .session
            .into_inner()
            .map_err(|_| CollectionError::Unavailable("session lock poisoned".to_string()))?;

        match outcome {
            Ok(()) => {
                session.commit_transaction().map_err(unavailable)?;
                debug!("TRANSACTION_COMMITTED");
                Ok(())
            }
            Err(err) => {
                if let Err(abort) = session.abort_transaction() {
                    warn!(error = %abort, "TRANSACTION_ABORT_FAILED");
                }
                warn!(error = %err, "TRANSACTION_ROLLED_BACK");
                Err(err)
            }
        }
    }
}

// ==================
// Session Scope
// ==================

/// The collection as seen from inside one transaction
struct SessionScope<'a> {
    collection: &'a Collection<Document>,
    session: Mutex<ClientSession>,
}

impl SessionScope<'_> {
    fn with_session<T>(
        &self,
        operation: impl FnOnce(&Collection<Document>, &mut ClientSession) -> CollectionResult<T>,
    ) -> CollectionResult<T> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| CollectionError::Unavailable("session lock poisoned".to_string()))?;
        operation(self.collection, &mut session)
    }
}

impl DocumentCollection for SessionScope<'_> {
    fn insert_one(&self, document: Value) -> CollectionResult<()> {
        let bson = to_bson_document(&document)?;
        self.with_session(|collection, session| {
            collection
                .insert_one_with_session(bson, None, session)
                .map(|_| ())
                .map_err(|e| collection_error(e, document_id(&document)))
        })
    }

    fn find_one(&self, filter: &Value) -> CollectionResult<Option<Value>> {
        let filter = to_bson_document(filter)?;
        self.with_session(|collection, session| {
            collection
                .find_one_with_session(filter, None, session)
                .map(|found| found.map(to_json))
                .map_err(unavailable)
        })
    }

    fn find_one_and_replace(
        &self,
        filter: &Value,
        replacement: Value,
    ) -> CollectionResult<Option<Value>> {
        let filter = to_bson_document(filter)?;
        let bson = to_bson_document(&replacement)?;
        self.with_session(|collection, session| {
            collection
                .find_one_and_replace_with_session(filter, bson, None, session)
                .map(|previous| previous.map(to_json))
                .map_err(|e| collection_error(e, document_id(&replacement)))
        })
    }

    fn find_one_and_update(&self, filter: &Value, update: &Update) -> CollectionResult<Option<Value>> {
        let filter = to_bson_document(filter)?;
        let update = modifications(update)?;
        self.with_session(|collection, session| {
            collection
                .find_one_and_update_with_session(filter, update, None, session)
                .map(|previous| previous.map(to_json))
                .map_err(unavailable)
        })
    }

    fn delete_one(&self, filter: &Value) -> CollectionResult<u64> {
        let filter = to_bson_document(filter)?;
        self.with_session(|collection, session| {
            collection
                .delete_one_with_session(filter, None, session)
                .map(|result| result.deleted_count)
                .map_err(unavailable)
        })
    }

    fn delete_many(&self, filter: &Value) -> CollectionResult<u64> {
        let filter = to_bson_document(filter)?;
        self.with_session(|collection, session| {
            collection
                .delete_many_with_session(filter, None, session)
                .map(|result| result.deleted_count)
                .map_err(unavailable)
        })
    }

    fn count(&self, filter: &Value) -> CollectionResult<u64> {
        let filter = to_bson_document(filter)?;
        self.with_session(|collection, session| {
            collection
                .count_documents_with_session(filter, None, session)
                .map_err(unavailable)
        })
    }

    fn aggregate(&self, pipeline: &[Value]) -> CollectionResult<Vec<Value>> {
        let pipeline = to_bson_documents(pipeline)?;
        self.with_session(|collection, session| {
            let mut cursor = collection
                .aggregate_with_session(pipeline, None, session)
                .map_err(unavailable)?;
            cursor
                .iter(session)
                .map(|document| document.map(to_json).map_err(unavailable))
                .collect()
        })
    }

    fn transaction(
        &self,
        _body: &mut dyn FnMut(&dyn DocumentCollection) -> RegistryResult<()>,
    ) -> RegistryResult<()> {
        Err(CollectionError::InvalidOperation("transactions cannot be nested".to_string()).into())
    }
}
