use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn id_column<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn user_fk(
    name: &str,
    table: impl IntoIden + 'static,
    column: impl IntoIden + 'static,
) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, column)
        .to(Users::Table, Users::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .on_update(ForeignKeyAction::Cascade)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(&mut id_column(Users::Id))
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CheckIns::Table)
                    .if_not_exists()
                    .col(&mut id_column(CheckIns::Id))
                    .col(ColumnDef::new(CheckIns::UserId).integer().not_null())
                    .col(ColumnDef::new(CheckIns::Mood).integer().not_null()) // 1-5
                    .col(ColumnDef::new(CheckIns::StressLevel).integer().not_null()) // 1-10
                    .col(ColumnDef::new(CheckIns::JournalEntry).text())
                    .col(ColumnDef::new(CheckIns::EmotionAnalysis).json_binary())
                    .col(ColumnDef::new(CheckIns::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut user_fk("fk-check_in-user_id", CheckIns::Table, CheckIns::UserId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChatMessages::Table)
                    .if_not_exists()
                    .col(&mut id_column(ChatMessages::Id))
                    .col(ColumnDef::new(ChatMessages::UserId).integer().not_null())
                    .col(ColumnDef::new(ChatMessages::Message).text().not_null())
                    .col(ColumnDef::new(ChatMessages::IsBot).boolean().not_null().default(false))
                    .col(ColumnDef::new(ChatMessages::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut user_fk(
                        "fk-chat_message-user_id",
                        ChatMessages::Table,
                        ChatMessages::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Exams::Table)
                    .if_not_exists()
                    .col(&mut id_column(Exams::Id))
                    .col(ColumnDef::new(Exams::UserId).integer().not_null())
                    .col(ColumnDef::new(Exams::Name).string().not_null())
                    .col(ColumnDef::new(Exams::Subject).string().not_null())
                    .col(ColumnDef::new(Exams::Date).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Exams::Completed).boolean().not_null().default(false))
                    .foreign_key(&mut user_fk("fk-exam-user_id", Exams::Table, Exams::UserId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(&mut id_column(Alerts::Id))
                    .col(ColumnDef::new(Alerts::UserId).integer().not_null())
                    .col(ColumnDef::new(Alerts::AlertType).string().not_null())
                    .col(ColumnDef::new(Alerts::Message).text().not_null())
                    .col(ColumnDef::new(Alerts::Resolved).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alerts::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut user_fk("fk-alert-user_id", Alerts::Table, Alerts::UserId))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Exams::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CheckIns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CheckIns {
    Table,
    Id,
    UserId,
    Mood,
    StressLevel,
    JournalEntry,
    EmotionAnalysis,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ChatMessages {
    Table,
    Id,
    UserId,
    Message,
    IsBot,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Exams {
    Table,
    Id,
    UserId,
    Name,
    Subject,
    Date,
    Completed,
}

#[derive(DeriveIden)]
enum Alerts {
    Table,
    Id,
    UserId,
    AlertType,
    Message,
    Resolved,
    CreatedAt,
}
