//! Interactive question loop over a fixed set of videos.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use crate::video::VideoId;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Run the chat command.
///
/// The videos are ingested once up front. Every line is then answered on its
/// own: earlier questions and answers are never sent to the model.
pub async fn run_chat(videos: &[String], settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner("Reading transcripts...");
    let video_ids = match pipeline.prepare(videos).await {
        Ok(ids) => {
            spinner.finish_and_clear();
            ids
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to prepare videos: {}", e));
            return Err(e.into());
        }
    };

    println!("\n{}", style("TubeQA Chat").bold().cyan());
    println!("{}\n", style("Type your questions, or 'exit' to quit.").dim());

    let stdin = io::stdin();
    let answered = converse(&pipeline, &video_ids, stdin.lock(), &mut io::stdout()).await?;
    debug!("Chat ended after {} questions", answered);

    Output::info("Goodbye!");
    Ok(())
}

/// Answer each line of `input` until `exit`, `quit` or end of input.
/// Returns the number of questions answered.
async fn converse<R, W>(
    pipeline: &Pipeline,
    video_ids: &[VideoId],
    mut input: R,
    output: &mut W,
) -> Result<usize>
where
    R: BufRead,
    W: Write,
{
    let mut answered = 0;

    loop {
        write!(output, "{} ", style("You:").green().bold())?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        match pipeline.answer(question, video_ids).await {
            Ok(answer) => {
                answered += 1;
                writeln!(output, "\n{} {}\n", style("TubeQA:").cyan().bold(), answer.text)?;
            }
            Err(e) => Output::error(&format!("Error: {}", e)),
        }
    }

    Ok(answered)
}
