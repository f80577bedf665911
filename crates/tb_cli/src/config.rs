use std::path::PathBuf;

use tb_core::Result;
use tb_inference::create_model;
use tb_publish::{ChatConfig, ChatPublisher, EmailConfig, EmailPublisher, FileConfig, FilePublisher};
use tb_sources::{FetchManager, FetchPlan};

use crate::pipeline::Pipeline;
use crate::{Credentials, RunArgs};

/// Everything one run needs, resolved once from flags and environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub topic: String,
    pub plan: FetchPlan,
    pub select_top: Option<usize>,
    pub language: String,
    pub dry_run: bool,
    pub inference: tb_inference::Config,
    pub email: EmailConfig,
    pub chat: ChatConfig,
    pub file: FileConfig,
}

impl AppConfig {
    pub fn new(topic: &str, output_dir: PathBuf, credentials: &Credentials, run: &RunArgs) -> Self {
        let inference = tb_inference::Config {
            api_key: credentials.gemini_api_key.clone(),
            model_name: credentials.gemini_model.clone(),
            ..tb_inference::Config::default()
        };
        let email = EmailConfig {
            smtp_host: credentials.smtp_host.clone(),
            smtp_port: credentials.smtp_port,
            username: credentials.gmail_user.clone(),
            password: credentials.gmail_app_password.clone(),
            recipient: credentials.recipient_email.clone(),
            topic: topic.to_string(),
            ..EmailConfig::default()
        };
        let chat = ChatConfig {
            bot_token: credentials.telegram_bot_token.clone(),
            chat_id: credentials.telegram_chat_id.clone(),
            topic: topic.to_string(),
            ..ChatConfig::default()
        };

        Self {
            topic: topic.to_string(),
            plan: FetchPlan::for_topic(topic, run.with_verge),
            select_top: run.select_top,
            language: run.language.clone(),
            dry_run: run.dry_run,
            inference,
            email,
            chat,
            file: FileConfig::new(output_dir, topic),
        }
    }

    /// Wires the model and, unless this is a dry run, the file/email/chat publishers.
    pub fn build_pipeline(&self, manager: FetchManager) -> Result<Pipeline> {
        let model = create_model(&self.inference)?;
        let mut pipeline = Pipeline::new(manager, self.plan.clone(), model, &self.topic)
            .with_selection(self.select_top)
            .with_language(&self.language);

        if !self.dry_run {
            pipeline.add_publisher(Box::new(FilePublisher::new(self.file.clone())));
            pipeline.add_publisher(Box::new(EmailPublisher::new(self.email.clone())));
            pipeline.add_publisher(Box::new(ChatPublisher::new(self.chat.clone())?));
        }
        Ok(pipeline)
    }
}
