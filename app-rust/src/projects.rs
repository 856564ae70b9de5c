use crate::{
    store::{encode, Document, DocumentPath, Query},
    types::now, Project, StudyError, StudyResult, UserSession,
};
use chrono::NaiveDate;
use serde_json::json;
use tracing::info;

const COLLECTION: &str = "projects";

pub struct ProjectService<'a> {
    session: &'a UserSession,
}

impl<'a> ProjectService<'a> {
    pub(crate) fn new(session: &'a UserSession) -> Self {
        Self { session }
    }

    fn path(&self, id: &str) -> DocumentPath {
        self.session.collection(COLLECTION).doc(id)
    }

    pub async fn create(
        &self,
        name: &str,
        date: NaiveDate,
        description: Option<String>,
    ) -> StudyResult<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StudyError::validation("Project name is required."));
        }

        let mut project = Project {
            id: String::new(),
            name: name.to_string(),
            description: description.filter(|text| !text.trim().is_empty()),
            date,
            chat_count: 0,
            created_at: now(),
        };
        project.id = self
            .session
            .store()
            .add(&self.session.collection(COLLECTION), encode(&project)?)
            .await?;
        info!(id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    pub async fn get(&self, id: &str) -> StudyResult<Option<Project>> {
        let document = self.session.store().get(&self.path(id)).await?;
        Ok(document.map(|document| document.decode::<Project>()).transpose()?)
    }

    pub async fn list(&self) -> StudyResult<Vec<Project>> {
        let documents = self
            .session
            .store()
            .list(&self.session.collection(COLLECTION), Query::new())
            .await?;
        Ok(documents
            .iter()
            .map(Document::decode::<Project>)
            .collect::<Result<_, _>>()?)
    }

    pub async fn increment_chat_count(&self, id: &str) -> StudyResult<u32> {
        let project = self
            .get(id)
            .await?
            .ok_or_else(|| StudyError::NotFound(format!("project {id}")))?;
        let chat_count = project.chat_count + 1;
        self.session
            .store()
            .update(&self.path(id), json!({ "chatCount": chat_count }))
            .await?;
        Ok(chat_count)
    }

    pub async fn delete(&self, id: &str) -> StudyResult<()> {
        self.session.store().delete(&self.path(id)).await?;
        Ok(())
    }
}
