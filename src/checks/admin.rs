use crate::discord::{Context, Error};

// A function which acts as a "check", to determine whether to call a command.
//
// Passes for the configured owner and anyone on the persisted admin list.
pub async fn admin(ctx: Context<'_>) -> Result<bool, Error> {
    let caller = ctx.author().id.get();
    if caller == ctx.data().settings.owner || ctx.data().state.lock().await.is_admin(caller) {
        return Ok(true);
    }

    ctx.say("You need to be an Admin to execute this command.")
        .await?;
    Ok(false)
}
