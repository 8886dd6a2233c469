use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    FullName,
    Description,
    AvatarUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    UserId,
    Content,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PostImages {
    Table,
    Id,
    PostId,
    Url,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    UserId,
    PostId,
    Content,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PostLikes {
    Table,
    Id,
    UserId,
    PostId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CommentLikes {
    Table,
    Id,
    UserId,
    CommentId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Follows {
    Table,
    Id,
    FollowerId,
    FolloweeId,
    CreatedAt,
}

fn id_column<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn timestamp_column<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

/// Cascading foreign key from `$from_tbl.$from_col` to `$to_tbl.$to_col`.
macro_rules! cascade_fk {
    ($from_tbl:expr, $from_col:expr, $to_tbl:expr, $to_col:expr $(,)?) => {
        &mut ForeignKey::create()
            .from($from_tbl, $from_col)
            .to($to_tbl, $to_col)
            .on_delete(ForeignKeyAction::Cascade)
            .on_update(ForeignKeyAction::Cascade)
            .to_owned()
    };
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(id_column(Users::Id))
                    .col(ColumnDef::new(Users::Username).string_len(20).not_null().unique_key())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::FullName).string())
                    .col(ColumnDef::new(Users::Description).text())
                    .col(ColumnDef::new(Users::AvatarUrl).string())
                    .col(timestamp_column(Users::CreatedAt))
                    .col(timestamp_column(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(id_column(Posts::Id))
                    .col(ColumnDef::new(Posts::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Posts::Content).text().not_null())
                    .col(timestamp_column(Posts::CreatedAt))
                    .col(timestamp_column(Posts::UpdatedAt))
                    .foreign_key(cascade_fk!(Posts::Table, Posts::UserId, Users::Table, Users::Id))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_created_at")
                    .table(Posts::Table)
                    .col(Posts::CreatedAt)
                    .col(Posts::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PostImages::Table)
                    .if_not_exists()
                    .col(id_column(PostImages::Id))
                    .col(ColumnDef::new(PostImages::PostId).big_integer().not_null())
                    .col(ColumnDef::new(PostImages::Url).string().not_null())
                    .foreign_key(cascade_fk!(
                        PostImages::Table,
                        PostImages::PostId,
                        Posts::Table,
                        Posts::Id,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(id_column(Comments::Id))
                    .col(ColumnDef::new(Comments::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Comments::PostId).big_integer().not_null())
                    .col(ColumnDef::new(Comments::Content).text().not_null())
                    .col(timestamp_column(Comments::CreatedAt))
                    .col(timestamp_column(Comments::UpdatedAt))
                    .foreign_key(cascade_fk!(
                        Comments::Table,
                        Comments::UserId,
                        Users::Table,
                        Users::Id,
                    ))
                    .foreign_key(cascade_fk!(
                        Comments::Table,
                        Comments::PostId,
                        Posts::Table,
                        Posts::Id,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comments_post_created_at")
                    .table(Comments::Table)
                    .col(Comments::PostId)
                    .col(Comments::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PostLikes::Table)
                    .if_not_exists()
                    .col(id_column(PostLikes::Id))
                    .col(ColumnDef::new(PostLikes::UserId).big_integer().not_null())
                    .col(ColumnDef::new(PostLikes::PostId).big_integer().not_null())
                    .col(timestamp_column(PostLikes::CreatedAt))
                    .foreign_key(cascade_fk!(
                        PostLikes::Table,
                        PostLikes::UserId,
                        Users::Table,
                        Users::Id,
                    ))
                    .foreign_key(cascade_fk!(
                        PostLikes::Table,
                        PostLikes::PostId,
                        Posts::Table,
                        Posts::Id,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_post_likes_user_post")
                    .table(PostLikes::Table)
                    .col(PostLikes::UserId)
                    .col(PostLikes::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CommentLikes::Table)
                    .if_not_exists()
                    .col(id_column(CommentLikes::Id))
                    .col(ColumnDef::new(CommentLikes::UserId).big_integer().not_null())
                    .col(ColumnDef::new(CommentLikes::CommentId).big_integer().not_null())
                    .col(timestamp_column(CommentLikes::CreatedAt))
                    .foreign_key(cascade_fk!(
                        CommentLikes::Table,
                        CommentLikes::UserId,
                        Users::Table,
                        Users::Id,
                    ))
                    .foreign_key(cascade_fk!(
                        CommentLikes::Table,
                        CommentLikes::CommentId,
                        Comments::Table,
                        Comments::Id,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_comment_likes_user_comment")
                    .table(CommentLikes::Table)
                    .col(CommentLikes::UserId)
                    .col(CommentLikes::CommentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Follows::Table)
                    .if_not_exists()
                    .col(id_column(Follows::Id))
                    .col(ColumnDef::new(Follows::FollowerId).big_integer().not_null())
                    .col(ColumnDef::new(Follows::FolloweeId).big_integer().not_null())
                    .col(timestamp_column(Follows::CreatedAt))
                    .foreign_key(cascade_fk!(
                        Follows::Table,
                        Follows::FollowerId,
                        Users::Table,
                        Users::Id,
                    ))
                    .foreign_key(cascade_fk!(
                        Follows::Table,
                        Follows::FolloweeId,
                        Users::Table,
                        Users::Id,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_follows_pair")
                    .table(Follows::Table)
                    .col(Follows::FollowerId)
                    .col(Follows::FolloweeId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Follows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CommentLikes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PostLikes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PostImages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}
