//! Line-oriented menu shell
//!
//! Thin dispatch onto the pipeline, the learning collector and the
//! fine-tuning trigger. Failures of a single action are printed and the
//! menu comes back; end of input quits. Terminal IO goes through tokio so
//! waiting for the user never blocks a runtime worker.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::learning::{FineTuneJob, LearningDataCollector};
use crate::pipeline::RagPipeline;

const MENU: &str = "
--- Knowledge base ---
1. Ask a question
2. Add knowledge
3. Provide learning data
4. Run fine-tuning
5. Quit";

/// Interactive menu over a pipeline
pub struct Shell<'a> {
    pipeline: &'a RagPipeline,
    collector: &'a LearningDataCollector,
    fine_tune: &'a FineTuneJob,
}

impl<'a> Shell<'a> {
    pub fn new(
        pipeline: &'a RagPipeline,
        collector: &'a LearningDataCollector,
        fine_tune: &'a FineTuneJob,
    ) -> Self {
        Self {
            pipeline,
            collector,
            fine_tune,
        }
    }

    /// Run until the user quits or input ends
    pub async fn run<R, W>(&self, mut input: R, mut out: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            say(&mut out, MENU).await?;
            let Some(choice) = prompt(&mut input, &mut out, "Your choice: ").await? else {
                break;
            };

            match choice.trim() {
                "1" => self.ask(&mut input, &mut out).await?,
                "2" => self.add(&mut input, &mut out).await?,
                "3" => self.learn(&mut input, &mut out).await?,
                "4" => self.fine_tune(&mut out).await?,
                "5" => {
                    say(&mut out, "Goodbye!").await?;
                    break;
                }
                _ => say(&mut out, "Invalid choice, please try again.").await?,
            }
        }
        Ok(())
    }

    async fn ask<R, W>(&self, input: &mut R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Some(question) = prompt(input, out, "Question: ").await? else {
            return Ok(());
        };

        match self.pipeline.answer(&question).await {
            Ok(answer) => {
                let mut text = format!("\nAnswer: {}\nSources:", answer.answer);
                if answer.sources.is_empty() {
                    text.push_str("\n  - none");
                }
                for doc in &answer.sources {
                    text.push_str(&format!("\n  - {} (ID: {})", doc.text, doc.id));
                }
                text.push_str(&format!("\n({} ms)", answer.processing_time_ms));
                say(out, &text).await?;
            }
            Err(e) => say(out, &format!("Error: {}", e)).await?,
        }
        Ok(())
    }

    async fn add<R, W>(&self, input: &mut R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Some(text) = prompt(input, out, "Knowledge text: ").await? else {
            return Ok(());
        };
        if text.trim().is_empty() {
            say(out, "Error: text must not be empty").await?;
            return Ok(());
        }
        let id = prompt(input, out, "Document id (empty for a generated one): ")
            .await?
            .unwrap_or_default();

        match self.pipeline.add_knowledge(&text, Some(&id)).await {
            Ok(doc) => say(out, &format!("Added '{}' (ID: {})", doc.text, doc.id)).await?,
            Err(e) => say(out, &format!("Error: {}", e)).await?,
        }
        Ok(())
    }

    async fn learn<R, W>(&self, input: &mut R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Some(text) = prompt(input, out, "Text to learn: ").await? else {
            return Ok(());
        };

        let message = match self.collector.append(&text).await {
            Ok(()) => format!("Learning data appended to {}", self.collector.path().display()),
            Err(e) => format!("Error: {}", e),
        };
        say(out, &message).await
    }

    async fn fine_tune<W: AsyncWrite + Unpin>(&self, out: &mut W) -> Result<()> {
        say(out, "Starting fine-tuning job. This can take a long time.").await?;

        match self.fine_tune.run().await {
            Ok(outcome) => say(out, &outcome.next_steps()).await,
            Err(e) => say(out, &format!("Error: {}", e)).await,
        }
    }
}

/// Write one line and flush
async fn say<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

/// Print `label` and read one line; `None` at end of input
async fn prompt<R, W>(input: &mut R, out: &mut W, label: &str) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    out.write_all(label.as_bytes()).await?;
    out.flush().await?;

    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FineTuneConfig;
    use crate::providers::{HashingEmbedder, LlmProvider};
    use crate::retrieval::DistanceMetric;
    use crate::storage::KnowledgeStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct FixedLlm;

    #[async_trait]
    impl LlmProvider for FixedLlm {
        async fn generate(&self, _prompt: &str, _max_tokens: usize) -> Result<String> {
            Ok("Bleu.".to_string())
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
        fn name(&self) -> &str {
            "fixed"
        }
        fn model(&self) -> &str {
            "fixed"
        }
    }

    async fn parts(dir: &TempDir) -> (RagPipeline, LearningDataCollector, FineTuneJob) {
        let store = Arc::new(
            KnowledgeStore::in_memory(Arc::new(HashingEmbedder::new(384)), DistanceMetric::Cosine)
                .unwrap(),
        );
        let collection = store.get_or_create("llm_knowledge").await.unwrap();
        let pipeline = RagPipeline::builder()
            .store(store)
            .llm(Arc::new(FixedLlm))
            .collection(collection)
            .build()
            .unwrap();

        let data = dir.path().join("learning_data.txt");
        let collector = LearningDataCollector::new(&data);
        let job = FineTuneJob::new(&FineTuneConfig::default(), &data);
        (pipeline, collector, job)
    }

    async fn run_script(script: &str, dir: &TempDir) -> (String, RagPipeline) {
        let (pipeline, collector, job) = parts(dir).await;

        let mut out = Vec::new();
        Shell::new(&pipeline, &collector, &job)
            .run(script.as_bytes(), &mut out)
            .await
            .unwrap();
        (String::from_utf8(out).unwrap(), pipeline)
    }

    #[tokio::test]
    async fn test_add_then_ask() {
        let dir = TempDir::new().unwrap();
        let script = "2\nLe ciel est bleu.\ndoc1\n1\nQuelle est la couleur du ciel ?\n5\n";
        let (output, pipeline) = run_script(script, &dir).await;

        assert!(output.contains("Added 'Le ciel est bleu.' (ID: doc1)"));
        assert!(output.contains("Answer: Bleu."));
        assert!(output.contains("Le ciel est bleu. (ID: doc1)"));
        assert!(output.contains("Goodbye!"));
        assert_eq!(pipeline.store().count(pipeline.collection()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_errors_keep_menu_running() {
        let dir = TempDir::new().unwrap();
        let script = "1\n   \n9\n4\n5\n";
        let (output, _) = run_script(script, &dir).await;

        assert!(output.contains("Error: Invalid input"));
        assert!(output.contains("Invalid choice"));
        assert!(output.contains("Error: Fine-tuning job error"));
        assert!(output.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn test_learning_data_and_eof() {
        let dir = TempDir::new().unwrap();
        let (output, _) = run_script("3\nLes chats aiment dormir.\n", &dir).await;

        assert!(output.contains("Learning data appended"));
        let content = std::fs::read_to_string(dir.path().join("learning_data.txt")).unwrap();
        assert_eq!(content, "Les chats aiment dormir.\n");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_slow_input_does_not_stall_runtime() {
        let dir = TempDir::new().unwrap();
        let (pipeline, collector, job) = parts(&dir).await;
        let (reader, mut writer) = tokio::io::duplex(64);

        // Typed from another task on the same single-threaded runtime
        let typist = tokio::spawn(async move {
            for line in ["2\n", "Le ciel est bleu.\n", "doc1\n", "5\n"] {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                writer.write_all(line.as_bytes()).await.unwrap();
            }
        });

        let mut out = Vec::new();
        Shell::new(&pipeline, &collector, &job)
            .run(tokio::io::BufReader::new(reader), &mut out)
            .await
            .unwrap();
        typist.await.unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("Added 'Le ciel est bleu.' (ID: doc1)"));
        assert!(output.contains("Goodbye!"));
    }
}
